#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Visibility {
    pub visible: bool,
}

impl Visibility {
    pub fn visible() -> Self {
        Self { visible: true }
    }

    /// Present in the graph (and pickable) but never drawn.
    pub fn hidden() -> Self {
        Self { visible: false }
    }
}
