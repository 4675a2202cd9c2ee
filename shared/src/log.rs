use tracing_subscriber::{
    fmt::{format, time::ChronoLocal},
    EnvFilter,
};

pub fn init_log() {
    let format = format::format()
        .with_level(true)
        .with_target(false)
        .with_timer(ChronoLocal::new("[%m-%d %H:%M:%S%.3f]".to_string()))
        .compact();

    let env_filter = EnvFilter::from_default_env()
        // everything below info stays quiet unless RUST_LOG overrides
        .add_directive("info".parse().unwrap());
    tracing_subscriber::fmt().with_env_filter(env_filter).event_format(format).init();
}
