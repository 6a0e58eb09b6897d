use crate::config::OrganParams;
use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttachmentState {
    #[default]
    Attached,
    Detaching,
    Removed,
}

/// State shared by leaves and flowers.
///
/// `position` is copied from the spawning segment's tip at creation and is
/// not updated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Attachment {
    pub position: Vec2,
    pub size: f32,
    pub angle: f32,
    pub age: u32,
    pub max_age: f32,
    pub sway_phase: f32,
    pub sway_amount: f32,
    pub color_variation: f32,
    pub state: AttachmentState,
    /// Accumulated while detaching; removal happens past a threshold.
    pub drift: f32,
}

impl Attachment {
    fn sprout(position: Vec2, base_angle: f32, params: &OrganParams, rng: &mut impl Rng) -> Self {
        Self {
            position,
            size: params.size.sample(rng),
            angle: base_angle + params.angle_offset.sample(rng),
            age: 0,
            max_age: params.lifetime.sample(rng),
            sway_phase: params.sway_phase.sample(rng),
            sway_amount: params.sway_amount.sample(rng),
            color_variation: params.color_variation.sample(rng),
            state: AttachmentState::Attached,
            drift: 0.0,
        }
    }
}

/// Common access used by the lifecycle sweep.
pub trait Organ {
    fn attachment(&self) -> &Attachment;
    fn attachment_mut(&mut self) -> &mut Attachment;
}

#[derive(Debug, Clone, Serialize)]
pub struct Leaf {
    pub attachment: Attachment,
}

impl Leaf {
    pub fn sprout(position: Vec2, base_angle: f32, params: &OrganParams, rng: &mut impl Rng) -> Self {
        Self {
            attachment: Attachment::sprout(position, base_angle, params, rng),
        }
    }
}

impl Organ for Leaf {
    fn attachment(&self) -> &Attachment {
        &self.attachment
    }

    fn attachment_mut(&mut self) -> &mut Attachment {
        &mut self.attachment
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Flower {
    pub attachment: Attachment,
    /// Opening progress in `[0, 1]`.
    pub bloom_progress: f32,
}

impl Flower {
    pub fn sprout(position: Vec2, base_angle: f32, params: &OrganParams, rng: &mut impl Rng) -> Self {
        Self {
            attachment: Attachment::sprout(position, base_angle, params, rng),
            bloom_progress: 0.0,
        }
    }

    pub fn is_blooming(&self) -> bool {
        self.bloom_progress >= 1.0
    }
}

impl Organ for Flower {
    fn attachment(&self) -> &Attachment {
        &self.attachment
    }

    fn attachment_mut(&mut self) -> &mut Attachment {
        &mut self.attachment
    }
}
