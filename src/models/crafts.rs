use serde::Serialize;

use super::base::BaseFields;
use super::validation::{FieldReader, FieldSpec, FieldType, ValidationError};
use super::{FieldValue, RawRow};

/// A concrete craft schema.
pub trait Craft: Sized {
    /// Type name, also the stem of the output file.
    const NAME: &'static str;

    /// Variant-specific attributes in declaration order.
    const FIELDS: &'static [FieldSpec];

    /// Validate one raw row decoded from `source_name`.
    fn validate(row: &RawRow, source_name: &str) -> Result<Self, ValidationError>;

    fn base(&self) -> &BaseFields;

    /// Values of `FIELDS`, same order.
    fn field_values(&self) -> Vec<FieldValue>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanderSaturn {
    #[serde(flatten)]
    pub base: BaseFields,
    pub core: f64,
    pub speed: f64,
    pub force: f64,
    pub clones: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanderVenus {
    #[serde(flatten)]
    pub base: BaseFields,
    pub core: f64,
    pub suspension: f64,
    pub thrust: f64,
    pub weight: f64,
    pub crew: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RocketSaturn {
    #[serde(flatten)]
    pub base: BaseFields,
    pub mass: f64,
    pub gravity: f64,
    pub temperature: f64,
    pub life: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RocketVenus {
    #[serde(flatten)]
    pub base: BaseFields,
    pub speed: f64,
    pub axis_angle: f64,
}

impl LanderSaturn {
    const CORE: FieldSpec = FieldSpec::new("core", FieldType::Float);
    const SPEED: FieldSpec = FieldSpec::aliased("speed", "SPEED", FieldType::Float);
    const FORCE: FieldSpec = FieldSpec::new("force", FieldType::Float);
    const CLONES: FieldSpec = FieldSpec::new("clones", FieldType::Int);
}

impl Craft for LanderSaturn {
    const NAME: &'static str = "LanderSaturn";
    const FIELDS: &'static [FieldSpec] = &[Self::CORE, Self::SPEED, Self::FORCE, Self::CLONES];

    fn validate(row: &RawRow, source_name: &str) -> Result<Self, ValidationError> {
        let mut fields = FieldReader::new(Self::NAME, row, source_name);
        let base = fields.base();
        let core = fields.float(&Self::CORE);
        let speed = fields.float(&Self::SPEED);
        let force = fields.float(&Self::FORCE);
        let clones = fields.int(&Self::CLONES);
        fields.finish()?;

        Ok(Self { base, core, speed, force, clones })
    }

    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn field_values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::Float(self.core),
            FieldValue::Float(self.speed),
            FieldValue::Float(self.force),
            FieldValue::Int(self.clones),
        ]
    }
}

impl LanderVenus {
    const CORE: FieldSpec = FieldSpec::aliased("core", "coRe", FieldType::Float);
    const SUSPENSION: FieldSpec = FieldSpec::new("suspension", FieldType::Float);
    const THRUST: FieldSpec = FieldSpec::new("thrust", FieldType::Float);
    const WEIGHT: FieldSpec = FieldSpec::new("weight", FieldType::Float);
    const CREW: FieldSpec = FieldSpec::new("crew", FieldType::Int);
}

impl Craft for LanderVenus {
    const NAME: &'static str = "LanderVenus";
    const FIELDS: &'static [FieldSpec] = &[
        Self::CORE,
        Self::SUSPENSION,
        Self::THRUST,
        Self::WEIGHT,
        Self::CREW,
    ];

    fn validate(row: &RawRow, source_name: &str) -> Result<Self, ValidationError> {
        let mut fields = FieldReader::new(Self::NAME, row, source_name);
        let base = fields.base();
        let core = fields.float(&Self::CORE);
        let suspension = fields.float(&Self::SUSPENSION);
        let thrust = fields.float(&Self::THRUST);
        let weight = fields.float(&Self::WEIGHT);
        let crew = fields.int(&Self::CREW);
        fields.finish()?;

        Ok(Self { base, core, suspension, thrust, weight, crew })
    }

    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn field_values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::Float(self.core),
            FieldValue::Float(self.suspension),
            FieldValue::Float(self.thrust),
            FieldValue::Float(self.weight),
            FieldValue::Int(self.crew),
        ]
    }
}

impl RocketSaturn {
    const MASS: FieldSpec = FieldSpec::aliased("mass", "Mass", FieldType::Float);
    const GRAVITY: FieldSpec = FieldSpec::new("gravity", FieldType::Float);
    const TEMPERATURE: FieldSpec = FieldSpec::new("temperature", FieldType::Float);
    const LIFE: FieldSpec = FieldSpec::new("life", FieldType::Bool);
}

impl Craft for RocketSaturn {
    const NAME: &'static str = "RocketSaturn";
    const FIELDS: &'static [FieldSpec] = &[
        Self::MASS,
        Self::GRAVITY,
        Self::TEMPERATURE,
        Self::LIFE,
    ];

    fn validate(row: &RawRow, source_name: &str) -> Result<Self, ValidationError> {
        let mut fields = FieldReader::new(Self::NAME, row, source_name);
        let base = fields.base();
        let mass = fields.float(&Self::MASS);
        let gravity = fields.float(&Self::GRAVITY);
        let temperature = fields.float(&Self::TEMPERATURE);
        let life = fields.bool(&Self::LIFE);
        fields.finish()?;

        Ok(Self { base, mass, gravity, temperature, life })
    }

    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn field_values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::Float(self.mass),
            FieldValue::Float(self.gravity),
            FieldValue::Float(self.temperature),
            FieldValue::Bool(self.life),
        ]
    }
}

impl RocketVenus {
    const SPEED: FieldSpec = FieldSpec::new("speed", FieldType::Float);
    const AXIS_ANGLE: FieldSpec = FieldSpec::aliased("axis_angle", "axis_ANGLE", FieldType::Float);
}

impl Craft for RocketVenus {
    const NAME: &'static str = "RocketVenus";
    const FIELDS: &'static [FieldSpec] = &[Self::SPEED, Self::AXIS_ANGLE];

    fn validate(row: &RawRow, source_name: &str) -> Result<Self, ValidationError> {
        let mut fields = FieldReader::new(Self::NAME, row, source_name);
        let base = fields.base();
        let speed = fields.float(&Self::SPEED);
        let axis_angle = fields.float(&Self::AXIS_ANGLE);
        fields.finish()?;

        Ok(Self { base, speed, axis_angle })
    }

    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn field_values(&self) -> Vec<FieldValue> {
        vec![FieldValue::Float(self.speed), FieldValue::Float(self.axis_angle)]
    }
}
