use colored::Color;

pub const PRIMARY: Color = Color::TrueColor { r: 94, g: 196, b: 255 };
pub const ACCENT: Color = Color::TrueColor { r: 255, g: 176, b: 59 };
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::TrueColor { r: 214, g: 214, b: 214 };

pub const OPEN_PORT: Color = Color::BrightGreen;
pub const SERVICE: Color = Color::Cyan;
pub const WARNING: Color = Color::Yellow;
