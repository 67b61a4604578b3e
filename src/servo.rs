//! Handle on one servo of a bus.
use crate::models::ServoModel;
use crate::protocol::BROADCAST_ID;

/// A servo attached to a [`Bus`](crate::Bus).
///
/// The handle does not own the bus: every operation borrows the bus
/// mutably for the duration of one transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Servo {
    model: &'static ServoModel,
    id: u8,
    bounds: Option<(u16, u16)>,
    position: u16,
}

impl Servo {
    /// Handle on servo `id` of the given model. Goal positions are not
    /// limited until bounds are set.
    pub fn new(model: &'static ServoModel, id: u8) -> Servo {
        Servo {
            model,
            id,
            bounds: None,
            position: 0,
        }
    }
    /// Sets the position bounds, swapping them if given in reverse.
    pub fn with_bounds(mut self, min: u16, max: u16) -> Servo {
        self.set_bounds(min, max);
        self
    }
    /// Sets the position bounds, swapping them if given in reverse.
    pub fn set_bounds(&mut self, min: u16, max: u16) {
        self.bounds = Some((min.min(max), min.max(max)));
    }
    /// Removes the position bounds.
    pub fn clear_bounds(&mut self) {
        self.bounds = None;
    }
    /// Position bounds, if any.
    pub fn bounds(&self) -> Option<(u16, u16)> {
        self.bounds
    }
    /// `position` brought within the bounds, unchanged when there are none.
    pub fn clamp(&self, position: u16) -> u16 {
        match self.bounds {
            Some((min, max)) => position.clamp(min, max),
            None => position,
        }
    }
    /// Model of the servo.
    pub fn model(&self) -> &'static ServoModel {
        self.model
    }
    /// Bus id.
    pub fn id(&self) -> u8 {
        self.id
    }
    /// Re-addresses the handle. Does not touch the servo, see
    /// [`Bus::change_id`](crate::Bus::change_id).
    pub fn set_id(&mut self, id: u8) {
        self.id = id;
    }
    /// `true` when the handle addresses every servo of the bus.
    pub fn is_broadcast(&self) -> bool {
        self.id == BROADCAST_ID
    }
    /// Last position read from the servo.
    pub fn position(&self) -> u16 {
        self.position
    }
    pub(crate) fn cache_position(&mut self, position: u16) {
        self.position = position;
    }
}
