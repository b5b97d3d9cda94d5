/// Board identification for supported targets.
///
/// Each board module names the target and its identity capabilities,
/// selected at compile time via feature flags.

#[cfg(feature = "board-core2")]
mod hw {
    pub const HAS_SECURE_ELEMENT: bool = true; // ATECC608 on the I2C bus
    pub const BOARD_NAME: &str = "m5stack_core2";
}

#[cfg(all(feature = "board-devkit", not(feature = "board-core2")))]
mod hw {
    pub const HAS_SECURE_ELEMENT: bool = false;
    pub const BOARD_NAME: &str = "esp32_devkit";
}

#[cfg(not(any(feature = "board-core2", feature = "board-devkit")))]
mod hw {
    pub const HAS_SECURE_ELEMENT: bool = false;
    pub const BOARD_NAME: &str = "unknown";
}

pub use hw::*;
