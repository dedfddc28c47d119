use super::config::WindField;
use crate::units::*;

/// Spatially varying vector field, sampled per particle.
pub trait VectorField: Send + Sync {
    fn sample(&self, position: Point) -> Vector;
}

pub struct ConstantVectorField {
    pub value: Vector,
}

impl VectorField for ConstantVectorField {
    #[inline]
    fn sample(&self, _position: Point) -> Vector {
        self.value
    }
}

/// Swirling field built from sines of the position, angles in radians.
///
/// Each component depends on a different position axis: (sin(x)·sin(a.z), sin(z)·sin(a.y), sin(y)·sin(a.x)).
pub struct SinusoidalVectorField {
    pub angles: Vector,
}

impl VectorField for SinusoidalVectorField {
    #[inline]
    fn sample(&self, position: Point) -> Vector {
        Vector::new(
            position.x.sin() * self.angles.z.sin(),
            position.z.sin() * self.angles.y.sin(),
            position.y.sin() * self.angles.x.sin(),
        )
    }
}

impl WindField {
    pub fn to_vector_field(&self) -> Box<dyn VectorField> {
        match self {
            WindField::Constant { velocity } => Box::new(ConstantVectorField { value: (*velocity).into() }),
            WindField::Sinusoidal { angles } => Box::new(SinusoidalVectorField { angles: (*angles).into() }),
        }
    }
}
