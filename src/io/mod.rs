//! IO devices
//!
//! Devices ingest host events through [`IoDevice::post_data`] and expose query accessors
//! that primitives poll. The engine never pushes into the host; the only outgoing path
//! is the cloud outbox, drained once per step.

pub mod clock;
pub mod cloud;
pub mod keyboard;
pub mod mouse;
pub mod user_data;

pub use clock::{ClockEvent, ProjectClock};
pub use cloud::{Cloud, CloudProvider, CloudRequest, VarUpdate};
pub use keyboard::{KeyEvent, Keyboard};
pub use mouse::{Mouse, MouseEvent};
pub use user_data::{UserData, UserDataEvent};

use crate::runtime::engine::{EventQueue, Target};
use crate::util::config::EngineConfig;
use crate::util::timer::SharedClock;

/// What a device may touch while ingesting an event
pub struct IoContext<'a> {
    /// Hat events raised by the device, dispatched after the next pass
    pub events: &'a mut EventQueue,
    /// The stage, owner of cloud variables
    pub stage: Option<&'a mut Target>,
}

/// A device fed by the host
pub trait IoDevice {
    /// Event payload the device accepts
    type Data;

    /// Ingest one host event
    fn post_data(
        &mut self,
        data: Self::Data,
        cx: &mut IoContext<'_>,
    );
}

/// Host event routed to one device by [`Runtime::post_io_data`](crate::Runtime::post_io_data)
#[derive(Debug, Clone, PartialEq)]
pub enum IoEvent {
    Keyboard(KeyEvent),
    Mouse(MouseEvent),
    Clock(ClockEvent),
    UserData(UserDataEvent),
    Cloud(VarUpdate),
}

/// The runtime's device registry
#[derive(Debug)]
pub struct IoDevices {
    pub keyboard: Keyboard,
    pub mouse: Mouse,
    pub clock: ProjectClock,
    pub user_data: UserData,
    pub cloud: Cloud,
}

impl IoDevices {
    pub fn new(
        config: &EngineConfig,
        clock: SharedClock,
    ) -> Self {
        Self {
            keyboard: Keyboard::new(),
            mouse: Mouse::new(config.stage_width, config.stage_height),
            clock: ProjectClock::new(clock.clone()),
            user_data: UserData::default(),
            cloud: Cloud::new(config.cloud_updates_per_second, clock),
        }
    }

    /// Route an event to its device
    pub fn post(
        &mut self,
        event: IoEvent,
        cx: &mut IoContext<'_>,
    ) {
        match event {
            IoEvent::Keyboard(data) => self.keyboard.post_data(data, cx),
            IoEvent::Mouse(data) => self.mouse.post_data(data, cx),
            IoEvent::Clock(data) => self.clock.post_data(data, cx),
            IoEvent::UserData(data) => self.user_data.post_data(data, cx),
            IoEvent::Cloud(data) => self.cloud.post_data(data, cx),
        }
    }
}
