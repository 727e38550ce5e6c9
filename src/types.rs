//! Shared types used across multiple modules.
//!
//! Geometry and the serializable tree snapshot live here so that `layout`,
//! `node` and the display backends can share them without depending on
//! each other.

use serde::{Deserialize, Serialize};

/// A rectangle representing geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Wider than tall. Square monitors count as portrait.
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }

    /// Shrink by `amount` on every side, keeping the top-left corner.
    ///
    /// X11 draws the border outside the content box, so the content box of a
    /// bordered window starts at the slot origin and is `2 * border` smaller.
    pub fn shrink(&self, amount: u32) -> Self {
        Self {
            x: self.x,
            y: self.y,
            width: self.width.saturating_sub(2 * amount),
            height: self.height.saturating_sub(2 * amount),
        }
    }
}

/// Snapshot of the task tree for debug output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub root: NodeSnapshot,
}

/// Snapshot of a single node in the task tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeSnapshot {
    Root {
        active: usize,
        children: Vec<NodeSnapshot>,
    },
    Task {
        name: String,
        active: usize,
        children: Vec<NodeSnapshot>,
    },
    Screen {
        active: usize,
        children: Vec<NodeSnapshot>,
    },
    Workspace {
        master_factor: f64,
        active: usize,
        children: Vec<NodeSnapshot>,
    },
    Window {
        id: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_orientation() {
        assert!(Rect::new(0, 0, 1920, 1080).is_landscape());
        assert!(!Rect::new(0, 0, 1080, 1920).is_landscape());
        assert!(!Rect::new(0, 0, 1000, 1000).is_landscape());
    }

    #[test]
    fn test_rect_shrink() {
        let rect = Rect::new(10, 20, 100, 200).shrink(2);
        assert_eq!(rect, Rect::new(10, 20, 96, 196));

        // Saturates instead of wrapping for tiny slots
        let rect = Rect::new(0, 0, 3, 3).shrink(2);
        assert_eq!(rect.width, 0);
        assert_eq!(rect.height, 0);
    }

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = TreeSnapshot {
            root: NodeSnapshot::Task {
                name: "work".to_string(),
                active: 0,
                children: vec![NodeSnapshot::Window { id: 42 }],
            },
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"type\":\"task\""));
        assert!(json.contains("\"name\":\"work\""));
        assert!(json.contains("42"));
    }
}
