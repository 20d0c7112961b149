//! Terminal colors used by CLI output.

pub const BLUE_RGB: (u8, u8, u8) = (20, 86, 240);
pub const RED_RGB: (u8, u8, u8) = (242, 63, 93);
pub const ORANGE_RGB: (u8, u8, u8) = (255, 99, 58);
pub const SILVER_RGB: (u8, u8, u8) = (201, 205, 212);
pub const GREEN_RGB: (u8, u8, u8) = (74, 222, 128);
