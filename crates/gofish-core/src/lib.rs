pub mod belief;
pub mod estimate;
pub mod game;
pub mod model;

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "gofish"
    }

    pub const fn codename() -> &'static str {
        "Two Seat Table"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
