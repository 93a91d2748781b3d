//! Synthetic answer sheets for the detection and pipeline tests.
//!
//! Sheets are 800 x 480 so that every logical cell of the 12 x 20 layout is
//! 40 px square. Marks are centred on the scan position `(40c + 25, 40r + 25)`
//! so every candidate a mark produces stays inside its own cell.

use crate::image::PixelBuffer;
use crate::state::Answer;

pub(crate) const SHEET_WIDTH: u32 = 800;
pub(crate) const SHEET_HEIGHT: u32 = 480;
const CELL: u32 = 40;
const MARK_HALF: u32 = 10;

pub(crate) fn blank_sheet() -> PixelBuffer {
    PixelBuffer::filled(SHEET_WIDTH, SHEET_HEIGHT, [255, 255, 255, 255])
        .expect("sheet size is non-zero")
}

pub(crate) fn cell_center(question: u32, option: Answer) -> (u32, u32) {
    let q = question - 1;
    let row = q / 5;
    let col = (q % 5) * 4 + option.index() as u32;
    (CELL * col + 25, CELL * row + 25)
}

/// Fills a square of half-size `half` around `center` with grey `level`.
pub(crate) fn fill_square(sheet: &mut PixelBuffer, (cx, cy): (u32, u32), half: u32, level: u8) {
    for y in cy - half..=cy + half {
        for x in cx - half..=cx + half {
            sheet.put_rgb(x, y, [level; 3]);
        }
    }
}

/// Fills the bubble of `option` for `question` with grey `level`.
pub(crate) fn mark(sheet: &mut PixelBuffer, question: u32, option: Answer, level: u8) {
    fill_square(sheet, cell_center(question, option), MARK_HALF, level);
}

pub(crate) fn sheet_with_marks(marks: &[(u32, Answer)]) -> PixelBuffer {
    let mut sheet = blank_sheet();
    for &(question, option) in marks {
        mark(&mut sheet, question, option, 0);
    }
    sheet
}

/// Black horizontal line across the whole sheet, centred on `y`.
pub(crate) fn draw_hline(sheet: &mut PixelBuffer, y: u32, thickness: u32) {
    let top = y - thickness / 2;
    for row in top..top + thickness {
        for x in 0..sheet.width() {
            sheet.put_rgb(x, row, [0; 3]);
        }
    }
}
