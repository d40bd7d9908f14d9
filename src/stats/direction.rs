//! Entered/exited classification of gate crossings
//!
//! Sensors report a signed crossing value. Which sign means "entering" depends
//! on how the gate was installed, so the caller supplies a direction reference.

/// Classification of a single gate crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    Entered,
    Exited,
}

/// Crossing value counted as entering for the given direction reference
pub fn entering_sign(direction_reference: bool) -> i64 {
    if direction_reference {
        -1
    } else {
        1
    }
}

/// Crossing value counted as exiting for the given direction reference
pub fn exiting_sign(direction_reference: bool) -> i64 {
    -entering_sign(direction_reference)
}

/// Classify a crossing; values other than the two signs count as neither
pub fn classify(crossed: i64, direction_reference: bool) -> Option<Crossing> {
    let default_orientation = match crossed {
        c if c == entering_sign(false) => Crossing::Entered,
        c if c == exiting_sign(false) => Crossing::Exited,
        _ => return None,
    };

    if direction_reference {
        Some(default_orientation.flipped())
    } else {
        Some(default_orientation)
    }
}

impl Crossing {
    pub fn flipped(self) -> Self {
        match self {
            Crossing::Entered => Crossing::Exited,
            Crossing::Exited => Crossing::Entered,
        }
    }
}
