//! Default theme values used by the stock components.

pub struct Theme;

impl Theme {
    pub const PRIMARY_COLOR: &'static str = "#4B4E75";
    pub const SECONDARY_COLOR: &'static str = "#A6B48B";
    pub const BACKGROUND_COLOR: &'static str = "#FFFFFF";
    pub const TEXT_COLOR: &'static str = "#333333";
    pub const FONT_FAMILY: &'static str = "Arial, sans-serif";
    pub const BORDER_RADIUS: &'static str = "15px";
    pub const PADDING: &'static str = "10px";
    pub const NORMAL_FONT_SIZE: &'static str = "16px";
}
