/// Orthogonal viewing plane through the volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Plane {
    Axial,
    Coronal,
    Sagittal,
}

/// How a view turns the scalar field into pixels.
///
/// `Slice` is served by the orthogonal plane renderer; the four remaining
/// modes are ray-marched projections.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    #[default]
    Slice,
    MaxIntensity,
    MinIntensity,
    AverageIntensity,
    Composite,
}

/// Fixed transfer-function preset for compositing volume rendering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransferPreset {
    #[default]
    Bone,
    SoftTissue,
    Lung,
    Angio,
}
