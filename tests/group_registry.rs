//! Group registry expiry sweep
//!
//! Exercises the cleanup rules over a grid of target and current
//! cycle/frame combinations: every combination satisfying a reset rule
//! clears the group, every other combination leaves it pending.

use rustyflex::groups::GroupRegistry;

/// Build a registry whose group 3 has the given target cycle and frame.
fn registry_with_target(target_cycle: u32, target_frame: u32) -> GroupRegistry {
    let mut reg = GroupRegistry::new();
    let viw = (1 << 4) | (target_frame << 10) | (3 << 17);
    if target_frame > 0 {
        // Registering one frame earlier in the target cycle keeps the
        // assigned frame ahead, so the target cycle is the current one
        reg.register(777, viw, target_cycle, target_frame - 1);
    } else {
        // Frame 0 is never ahead; register in the previous cycle
        let prev_cycle = if target_cycle == 0 { 15 } else { target_cycle - 1 };
        reg.register(777, viw, prev_cycle, 0);
    }
    let entry = reg.entry(3);
    assert_eq!(entry.target_cycle, target_cycle as i16);
    assert_eq!(entry.target_frame, target_frame as i16);
    reg
}

/// The expiry rules as specified, written out independently.
fn should_expire(target_cycle: u32, target_frame: u32, cycle: u32, frame: u32) -> bool {
    if cycle == target_cycle {
        target_frame < frame
    } else if cycle == 0 {
        target_cycle == 15
    } else if cycle == 15 && target_cycle == 0 {
        false
    } else {
        target_cycle < cycle
    }
}

#[test]
fn test_expiry_grid() {
    let frames = [0u32, 1, 63, 100, 126, 127];
    for target_cycle in 0..16 {
        for &target_frame in &frames {
            for cycle in 0..16 {
                for &frame in &frames {
                    let mut reg = registry_with_target(target_cycle, target_frame);
                    let missed = reg.cleanup(cycle, frame);
                    let expired = should_expire(target_cycle, target_frame, cycle, frame);
                    assert_eq!(
                        !missed.is_empty(),
                        expired,
                        "target {}/{} at current {}/{}",
                        target_cycle,
                        target_frame,
                        cycle,
                        frame
                    );
                    assert_eq!(reg.entry(3).has_pending(), !expired);
                    if expired {
                        assert_eq!(missed, vec![3]);
                    }
                }
            }
        }
    }
}

#[test]
fn test_delivery_beats_expiry_in_target_frame() {
    // In the target frame itself the group is still live: a delivery
    // there must find the capcodes
    let mut reg = registry_with_target(2, 101);
    assert!(reg.cleanup(2, 101).is_empty());
    assert_eq!(reg.deliver(3), Some(vec![777]));
}

#[test]
fn test_multiple_groups_expire_independently() {
    let mut reg = GroupRegistry::new();
    reg.register(100, (1 << 4) | (10 << 10) | (1 << 17), 2, 5); // target 2/10
    reg.register(200, (1 << 4) | (90 << 10) | (6 << 17), 2, 5); // target 2/90
    let missed = reg.cleanup(2, 50);
    assert_eq!(missed, vec![1]);
    assert!(!reg.entry(1).has_pending());
    assert!(reg.entry(6).has_pending());
}
