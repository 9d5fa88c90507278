//! Mouse state

use super::{IoContext, IoDevice};
use crate::util::math::clamp;

/// Pointer movement or button change, in host canvas coordinates
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MouseEvent {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub is_down: Option<bool>,
}

/// Pointer position in client and stage coordinates, plus button state
#[derive(Debug, Clone, PartialEq)]
pub struct Mouse {
    stage_width: f64,
    stage_height: f64,
    client_x: f64,
    client_y: f64,
    scratch_x: f64,
    scratch_y: f64,
    is_down: bool,
}

impl Mouse {
    pub fn new(
        stage_width: f64,
        stage_height: f64,
    ) -> Self {
        Self {
            stage_width,
            stage_height,
            client_x: 0.0,
            client_y: 0.0,
            scratch_x: 0.0,
            scratch_y: 0.0,
            is_down: false,
        }
    }

    pub fn client_x(&self) -> f64 {
        self.client_x
    }

    pub fn client_y(&self) -> f64 {
        self.client_y
    }

    /// Stage x, rounded and clamped to the stage
    pub fn scratch_x(&self) -> f64 {
        self.scratch_x
    }

    /// Stage y, rounded and clamped to the stage
    pub fn scratch_y(&self) -> f64 {
        self.scratch_y
    }

    pub fn is_down(&self) -> bool {
        self.is_down
    }
}

impl IoDevice for Mouse {
    type Data = MouseEvent;

    fn post_data(
        &mut self,
        data: MouseEvent,
        _cx: &mut IoContext<'_>,
    ) {
        let (width, height) = (self.stage_width, self.stage_height);
        if let Some(x) = data.x.filter(|_| data.canvas_width > 0.0) {
            self.client_x = x;
            let stage_x = width * (x / data.canvas_width - 0.5);
            self.scratch_x = js_round(clamp(stage_x, -width / 2.0, width / 2.0));
        }
        if let Some(y) = data.y.filter(|_| data.canvas_height > 0.0) {
            self.client_y = y;
            let stage_y = -height * (y / data.canvas_height - 0.5);
            self.scratch_y = js_round(clamp(stage_y, -height / 2.0, height / 2.0));
        }
        if let Some(is_down) = data.is_down {
            self.is_down = is_down;
        }
    }
}

/// Round half up, so `-0.5` rounds to `0`
fn js_round(n: f64) -> f64 {
    (n + 0.5).floor()
}
