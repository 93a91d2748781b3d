fn main() {
    // the default level should not be higher than warn, warnings must not be disregarded
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = omrscore_lib::commands::run() {
        omrscore_lib::err_log!(&*e);
        std::process::exit(1);
    }
}
