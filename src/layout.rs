//! Master-stack tiling.
//!
//! A workspace's windows are ordered oldest first; the last one is the
//! master. The master takes `master_factor` of the monitor along the long
//! axis and the remaining windows share the rest in equal slots.

use crate::types::Rect;

pub const MASTER_FACTOR_MIN: f64 = 0.1;
pub const MASTER_FACTOR_MAX: f64 = 0.9;

/// Windows not on the active path are parked here, outside the visible
/// range of the 16-bit signed X11 coordinate space.
pub const PARK_POSITION: i32 = i16::MAX as i32;

/// How the master and the stack share a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitDirection {
    /// Master and stack side by side: master on the left, stack slots
    /// top-to-bottom on the right
    SideBySide,
    /// Master stacked above the stack: stack slots left-to-right below it
    Stacked,
}

impl SplitDirection {
    /// Landscape monitors split side by side, everything else top/bottom
    pub fn for_screen(screen: Rect) -> Self {
        if screen.is_landscape() {
            SplitDirection::SideBySide
        } else {
            SplitDirection::Stacked
        }
    }
}

/// Where one window goes: its content box and border width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub rect: Rect,
    pub border_width: u32,
}

/// Clamp a master factor into the allowed range
pub fn clamp_master_factor(factor: f64) -> f64 {
    factor.clamp(MASTER_FACTOR_MIN, MASTER_FACTOR_MAX)
}

/// Compute placements for `count` windows on `screen`.
///
/// The result is indexed like the workspace's children: element `i` belongs
/// to the `i`-th oldest window and the last element is the master. Stack
/// slots are handed out most-recent first, so the window just below the
/// master gets the first slot.
///
/// Slot sizes are truncated; leftover pixels at the far edge stay empty.
pub fn master_stack(count: usize, screen: Rect, master_factor: f64, border: u32) -> Vec<Placement> {
    match count {
        0 => Vec::new(),
        1 => vec![Placement {
            rect: screen,
            border_width: 0,
        }],
        _ => {
            let stack_len = count - 1;
            let direction = SplitDirection::for_screen(screen);
            let (master, slots) = match direction {
                SplitDirection::SideBySide => {
                    let master_width = (screen.width as f64 * master_factor) as u32;
                    let stack_width = screen.width - master_width;
                    let slot_height = screen.height / stack_len as u32;
                    let master = Rect::new(screen.x, screen.y, master_width, screen.height);
                    let slots: Vec<Rect> = (0..stack_len)
                        .map(|i| {
                            Rect::new(
                                screen.x + master_width as i32,
                                screen.y + (i as u32 * slot_height) as i32,
                                stack_width,
                                slot_height,
                            )
                        })
                        .collect();
                    (master, slots)
                }
                SplitDirection::Stacked => {
                    let master_height = (screen.height as f64 * master_factor) as u32;
                    let stack_height = screen.height - master_height;
                    let slot_width = screen.width / stack_len as u32;
                    let master = Rect::new(screen.x, screen.y, screen.width, master_height);
                    let slots: Vec<Rect> = (0..stack_len)
                        .map(|i| {
                            Rect::new(
                                screen.x + (i as u32 * slot_width) as i32,
                                screen.y + master_height as i32,
                                slot_width,
                                stack_height,
                            )
                        })
                        .collect();
                    (master, slots)
                }
            };

            let bordered = |rect: Rect| Placement {
                rect: rect.shrink(border),
                border_width: border,
            };
            // Window i (oldest first) takes slot stack_len - 1 - i
            let mut placements: Vec<Placement> = slots.into_iter().rev().map(bordered).collect();
            placements.push(bordered(master));
            placements
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_HD: Rect = Rect {
        x: 0,
        y: 0,
        width: 1920,
        height: 1080,
    };

    #[test]
    fn test_empty_workspace() {
        assert!(master_stack(0, FULL_HD, 0.6, 2).is_empty());
    }

    #[test]
    fn test_single_window_fills_screen_without_border() {
        let placements = master_stack(1, FULL_HD, 0.6, 2);
        assert_eq!(
            placements,
            vec![Placement {
                rect: FULL_HD,
                border_width: 0
            }]
        );
    }

    #[test]
    fn test_two_windows_landscape() {
        let placements = master_stack(2, FULL_HD, 0.6, 2);
        let (stack, master) = (placements[0], placements[1]);

        // floor(1920 * 0.6) = 1152
        assert_eq!(master.rect, Rect::new(0, 0, 1152 - 4, 1080 - 4));
        assert_eq!(master.border_width, 2);
        assert_eq!(stack.rect, Rect::new(1152, 0, 768 - 4, 1080 - 4));
        assert_eq!(stack.border_width, 2);
    }

    #[test]
    fn test_stack_order_most_recent_first() {
        let placements = master_stack(4, FULL_HD, 0.5, 0);
        // Three stack slots of 360px; window 2 (just below master) on top
        assert_eq!(placements[2].rect, Rect::new(960, 0, 960, 360));
        assert_eq!(placements[1].rect, Rect::new(960, 360, 960, 360));
        assert_eq!(placements[0].rect, Rect::new(960, 720, 960, 360));
        assert_eq!(placements[3].rect, Rect::new(0, 0, 960, 1080));
    }

    #[test]
    fn test_portrait_splits_top_bottom() {
        let screen = Rect::new(100, 50, 1080, 1920);
        let placements = master_stack(3, screen, 0.6, 0);
        // floor(1920 * 0.6) = 1152 tall master, two 540px columns beneath
        assert_eq!(placements[2].rect, Rect::new(100, 50, 1080, 1152));
        assert_eq!(placements[1].rect, Rect::new(100, 50 + 1152, 540, 768));
        assert_eq!(placements[0].rect, Rect::new(100 + 540, 50 + 1152, 540, 768));
    }

    #[test]
    fn test_split_direction_follows_orientation() {
        assert_eq!(
            SplitDirection::for_screen(Rect::new(0, 0, 1920, 1080)),
            SplitDirection::SideBySide
        );
        assert_eq!(
            SplitDirection::for_screen(Rect::new(0, 0, 1080, 1920)),
            SplitDirection::Stacked
        );
    }

    #[test]
    fn test_square_screen_is_portrait() {
        assert_eq!(
            SplitDirection::for_screen(Rect::new(0, 0, 1000, 1000)),
            SplitDirection::Stacked
        );
    }

    #[test]
    fn test_truncated_slots_leave_remainder_unused() {
        // 1080 / 7 = 154 remainder 2: the bottom two rows are never covered
        let placements = master_stack(8, FULL_HD, 0.6, 0);
        let bottom = placements[..7]
            .iter()
            .map(|p| p.rect.y + p.rect.height as i32)
            .max()
            .unwrap();
        assert_eq!(bottom, 1078);
        assert!(placements[..7].iter().all(|p| p.rect.height == 154));
    }

    #[test]
    fn test_offset_screen_origin() {
        let screen = Rect::new(1920, 0, 1280, 1024);
        let placements = master_stack(2, screen, 0.5, 1);
        assert_eq!(placements[1].rect, Rect::new(1920, 0, 638, 1022));
        assert_eq!(placements[0].rect, Rect::new(1920 + 640, 0, 638, 1022));
    }

    #[test]
    fn test_clamp_master_factor() {
        assert_eq!(clamp_master_factor(0.95), MASTER_FACTOR_MAX);
        assert_eq!(clamp_master_factor(-3.0), MASTER_FACTOR_MIN);
        assert_eq!(clamp_master_factor(0.5), 0.5);
    }
}
