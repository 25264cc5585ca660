use glam::Vec2;
use rustc_hash::FxHashSet;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

/// Per-frame pointer state fed from winit events.
#[derive(Default, Debug, Clone)]
pub struct Input {
    /// 当前鼠标在窗口内的位置
    pub cursor_position: Vec2,
    /// 上一帧到这一帧的鼠标位移 (dx, dy)
    pub cursor_delta: Vec2,
    /// 这一帧的滚轮滚动量 (x, y)
    pub scroll_delta: Vec2,
    /// 窗口大小
    pub screen_size: Vec2,
    mouse_buttons: FxHashSet<MouseButton>,
    has_cursor: bool,
}

impl Input {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            screen_size: Vec2::new(width as f32, height as f32),
            ..Self::default()
        }
    }

    /// Feeds one window event. Returns `true` when the event was pointer input.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::Resized(size) => {
                self.handle_resize(size.width, size.height);
                false
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.handle_cursor_move(position.x, position.y);
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.has_cursor = false;
                true
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.handle_mouse_input(*state, *button);
                true
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.handle_mouse_wheel(*delta);
                true
            }
            _ => false,
        }
    }

    /// 帧末清理（清除 delta 状态，防止一直旋转）
    pub fn end_frame(&mut self) {
        self.cursor_delta = Vec2::ZERO;
        self.scroll_delta = Vec2::ZERO;
    }

    pub fn handle_resize(&mut self, width: u32, height: u32) {
        self.screen_size = Vec2::new(width as f32, height as f32);
    }

    pub fn handle_cursor_move(&mut self, x: f64, y: f64) {
        let new_pos = Vec2::new(x as f32, y as f32);
        // 光标刚进入窗口时不产生位移
        if self.has_cursor {
            self.cursor_delta += new_pos - self.cursor_position;
        }
        self.cursor_position = new_pos;
        self.has_cursor = true;
    }

    pub fn handle_mouse_input(&mut self, state: ElementState, button: MouseButton) {
        match state {
            ElementState::Pressed => {
                self.mouse_buttons.insert(button);
            }
            ElementState::Released => {
                self.mouse_buttons.remove(&button);
            }
        }
    }

    pub fn handle_mouse_wheel(&mut self, delta: MouseScrollDelta) {
        match delta {
            MouseScrollDelta::LineDelta(x, y) => {
                self.scroll_delta += Vec2::new(x, y);
            }
            MouseScrollDelta::PixelDelta(pos) => {
                // PixelDelta 数值较大，粗略换算成行
                self.scroll_delta += Vec2::new(pos.x as f32, pos.y as f32) * 0.1;
            }
        }
    }

    #[must_use]
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.mouse_buttons.contains(&button)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_cursor_sample_has_no_delta() {
        let mut input = Input::new(800, 600);
        input.handle_cursor_move(10.0, 10.0);
        assert_eq!(input.cursor_delta, Vec2::ZERO);
        input.handle_cursor_move(15.0, 7.0);
        assert_eq!(input.cursor_delta, Vec2::new(5.0, -3.0));

        input.end_frame();
        assert_eq!(input.cursor_delta, Vec2::ZERO);
        assert_eq!(input.cursor_position, Vec2::new(15.0, 7.0));
    }

    #[test]
    fn buttons_track_press_and_release() {
        let mut input = Input::default();
        input.handle_mouse_input(ElementState::Pressed, MouseButton::Left);
        assert!(input.is_button_pressed(MouseButton::Left));
        input.handle_mouse_input(ElementState::Released, MouseButton::Left);
        assert!(!input.is_button_pressed(MouseButton::Left));
    }
}
