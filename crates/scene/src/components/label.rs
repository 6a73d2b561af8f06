use foundation::color::Color;

/// Overlay text anchored at the node position.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelComponent {
    pub text: String,
    pub font_px: f64,
    pub color: Color,
    /// Screen-space lift above the anchor, in pixels.
    pub offset_y_px: f64,
}
