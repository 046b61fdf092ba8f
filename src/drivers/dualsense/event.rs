use super::input::{Battery, Buttons, ControllerState, Touch};

/// Events that can be emitted by a controller
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Button(ButtonEvent),
    Axis(AxisEvent),
    Trigger(TriggerEvent),
    Touch(TouchEvent),
    Motion(MotionEvent),
    Battery(Battery),
    Audio(AudioEvent),
}

/// A single button changed state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonEvent {
    /// Exactly one flag
    pub button: Buttons,
    pub pressed: bool,
}

/// Normalized stick position
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisInput {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AxisEvent {
    LStick(AxisInput),
    RStick(AxisInput),
}

/// Normalized trigger position
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerInput {
    pub value: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TriggerEvent {
    L2(TriggerInput),
    R2(TriggerInput),
}

/// A touch contact started, moved or ended. Ended contacts carry their last
/// position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TouchEvent {
    pub id: u8,
    pub is_touching: bool,
    pub x: u16,
    pub y: u16,
}

/// Raw sensor triple
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MotionInput {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl From<[i16; 3]> for MotionInput {
    fn from(value: [i16; 3]) -> Self {
        Self {
            x: value[0],
            y: value[1],
            z: value[2],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionEvent {
    Accelerometer(MotionInput),
    /// Pitch, yaw, roll
    Gyro(MotionInput),
}

/// Headset jack state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioEvent {
    pub headphone_connected: bool,
    pub microphone_connected: bool,
}

/// Translates the difference between two snapshots into events
pub fn translate(old: &ControllerState, new: &ControllerState) -> Vec<Event> {
    let mut events = Vec::new();

    // Button events
    let changed = old.buttons ^ new.buttons;
    for (_, button) in changed.iter_names() {
        events.push(Event::Button(ButtonEvent {
            button,
            pressed: new.buttons.contains(button),
        }));
    }

    // Axis events
    if (old.axes.left_x, old.axes.left_y) != (new.axes.left_x, new.axes.left_y) {
        events.push(Event::Axis(AxisEvent::LStick(AxisInput {
            x: new.axes.left_x,
            y: new.axes.left_y,
        })));
    }
    if (old.axes.right_x, old.axes.right_y) != (new.axes.right_x, new.axes.right_y) {
        events.push(Event::Axis(AxisEvent::RStick(AxisInput {
            x: new.axes.right_x,
            y: new.axes.right_y,
        })));
    }
    if old.axes.l2 != new.axes.l2 {
        events.push(Event::Trigger(TriggerEvent::L2(TriggerInput {
            value: new.axes.l2,
        })));
    }
    if old.axes.r2 != new.axes.r2 {
        events.push(Event::Trigger(TriggerEvent::R2(TriggerInput {
            value: new.axes.r2,
        })));
    }

    // Touch events
    for touch in new.touches.iter() {
        if !old.touches.contains(touch) {
            events.push(Event::Touch(touch_event(touch, true)));
        }
    }
    for touch in old.touches.iter() {
        if !new.touches.iter().any(|t| t.id == touch.id) {
            events.push(Event::Touch(touch_event(touch, false)));
        }
    }

    // Motion events
    if old.accel != new.accel {
        events.push(Event::Motion(MotionEvent::Accelerometer(new.accel.into())));
    }
    if old.gyro != new.gyro {
        events.push(Event::Motion(MotionEvent::Gyro(new.gyro.into())));
    }

    if old.battery != new.battery {
        events.push(Event::Battery(new.battery));
    }
    if (old.headphone_connected, old.microphone_connected)
        != (new.headphone_connected, new.microphone_connected)
    {
        events.push(Event::Audio(AudioEvent {
            headphone_connected: new.headphone_connected,
            microphone_connected: new.microphone_connected,
        }));
    }

    events
}

fn touch_event(touch: &Touch, is_touching: bool) -> TouchEvent {
    TouchEvent {
        id: touch.id,
        is_touching,
        x: touch.x,
        y: touch.y,
    }
}
