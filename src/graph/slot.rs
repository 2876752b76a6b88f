//! Slot descriptors for the step system.
//!
//! Each step declares its slots (inputs/outputs) once, at construction. The
//! network uses these to validate connections and to allocate the output
//! data objects. A slot's declared type never changes afterwards.

use crate::graph::data::DataType;
use std::borrow::Cow;

/// Whether a slot is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotDirection {
    Input,
    Output,
}

/// Descriptor for a step's slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotDescriptor {
    pub name: Cow<'static, str>,
    pub direction: SlotDirection,
    pub data_type: DataType,
    /// A mandatory input must be connected (and fresh) for the step to compute.
    pub mandatory: bool,
}

impl SlotDescriptor {
    pub fn input(name: impl Into<Cow<'static, str>>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            direction: SlotDirection::Input,
            data_type,
            mandatory: true,
        }
    }

    pub fn optional_input(name: impl Into<Cow<'static, str>>, data_type: DataType) -> Self {
        Self {
            mandatory: false,
            ..Self::input(name, data_type)
        }
    }

    pub fn output(name: impl Into<Cow<'static, str>>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            direction: SlotDirection::Output,
            data_type,
            mandatory: false,
        }
    }

    pub fn is_input(&self) -> bool {
        self.direction == SlotDirection::Input
    }
}

/// Name of the first slot that appears twice in the same direction, if any.
pub fn find_duplicate(slots: &[SlotDescriptor]) -> Option<&str> {
    slots.iter().enumerate().find_map(|(i, slot)| {
        slots[..i]
            .iter()
            .any(|prev| prev.direction == slot.direction && prev.name == slot.name)
            .then_some(&*slot.name)
    })
}
