use proptest::prelude::*;
use std::collections::HashSet;
use zprobe_camtools::probe_grid::GridPlanner;
use zprobe_core::{CommandIntent, GridConfig};

fn single_row() -> GridConfig {
    GridConfig {
        x_start: 0.0,
        x_end: 10.0,
        x_step: 5.0,
        y_start: 0.0,
        y_end: 0.0,
        y_step: 5.0,
        ..GridConfig::default()
    }
}

fn count(planner: &GridPlanner, intent: CommandIntent) -> usize {
    planner
        .plan()
        .iter()
        .filter(|c| c.intent == intent)
        .count()
}

#[test]
fn test_single_row_plan() {
    let planner = GridPlanner::new(single_row());
    let plan = planner.plan();

    assert_eq!(count(&planner, CommandIntent::Probe), 3);
    assert_eq!(count(&planner, CommandIntent::ArcHop), 2);
    assert!(!plan.iter().any(|c| c.text == "G19"));

    let hops: Vec<&str> = plan
        .iter()
        .filter(|c| c.intent == CommandIntent::ArcHop)
        .map(|c| c.text.as_str())
        .collect();
    assert_eq!(
        hops,
        vec![
            "G3 X5.000 Z15.000 I2.500 K0 F1000.0",
            "G3 X10.000 Z15.000 I2.500 K0 F1000.0",
        ]
    );
}

#[test]
fn test_setup_block() {
    let plan = GridPlanner::new(single_row()).plan();
    let texts: Vec<&str> = plan.iter().take(6).map(|c| c.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["G21", "G90", "G92 X0 Y0", "G18", "G0 Z15.000", "G0 X0.000 Y0.000"]
    );
    assert_eq!(plan.last().map(|c| c.text.as_str()), Some("G17"));
}

#[test]
fn test_last_point_has_no_hop() {
    let plan = GridPlanner::new(single_row()).plan();
    let last_probe = plan.iter().rposition(|c| c.is_probe()).unwrap();
    assert!(plan[last_probe..]
        .iter()
        .all(|c| c.intent != CommandIntent::ArcHop));
}

#[test]
fn test_row_turn_uses_yz_plane() {
    let planner = GridPlanner::new(GridConfig {
        x_end: 10.0,
        x_step: 10.0,
        y_end: 10.0,
        y_step: 10.0,
        ..GridConfig::default()
    });
    let plan = planner.plan();
    let texts: Vec<&str> = plan.iter().map(|c| c.text.as_str()).collect();

    let turn = texts.iter().position(|t| *t == "G19").unwrap();
    assert_eq!(texts[turn + 1], "G2 Y10.000 Z15.000 J5.000 K0 F1000.0");
    assert_eq!(texts[turn + 2], "G18");

    // Second row runs back towards X0
    assert!(texts.contains(&"G2 X0.000 Z15.000 I-5.000 K0 F1000.0"));
}

#[test]
fn test_dwell_before_each_probe() {
    let planner = GridPlanner::new(GridConfig {
        dwell_seconds: 0.5,
        ..single_row()
    });
    let plan = planner.plan();
    assert_eq!(count(&planner, CommandIntent::Dwell), 3);
    for (i, cmd) in plan.iter().enumerate() {
        if cmd.is_probe() {
            assert_eq!(plan[i - 1].text, "G4 P0.500");
        }
    }
}

#[test]
fn test_no_zero_offset_after_probe_in_plan() {
    let plan = GridPlanner::new(single_row()).plan();
    assert!(!plan.iter().any(|c| c.text == "G92 Z0"));
}

#[test]
fn test_zero_step_is_single_point() {
    let planner = GridPlanner::new(GridConfig {
        x_step: 0.0,
        y_step: 0.0,
        ..GridConfig::default()
    });
    assert_eq!(planner.points().len(), 1);
    assert_eq!(count(&planner, CommandIntent::Probe), 1);
    assert_eq!(count(&planner, CommandIntent::ArcHop), 0);
}

#[test]
fn test_to_gcode() {
    let gcode = GridPlanner::new(single_row()).to_gcode();
    assert!(gcode.starts_with("; Z Probe Grid\n"));
    assert!(gcode.contains("G38.2 Z-20.000 F1000.0\n"));
}

proptest! {
    #[test]
    fn prop_every_point_once_and_axis_aligned(
        x_cols in 1usize..8,
        y_rows in 1usize..8,
        x_step in 0.5f64..20.0,
        y_step in 0.5f64..20.0,
    ) {
        let config = GridConfig {
            x_start: 0.0,
            y_start: 0.0,
            x_end: x_step * (x_cols - 1) as f64,
            y_end: y_step * (y_rows - 1) as f64,
            x_step,
            y_step,
            ..GridConfig::default()
        };
        let planner = GridPlanner::new(config);
        let points = planner.points();

        prop_assert_eq!(points.len(), x_cols * y_rows);

        let unique: HashSet<(u64, u64)> = points
            .iter()
            .map(|p| (p.x.to_bits(), p.y.to_bits()))
            .collect();
        prop_assert_eq!(unique.len(), points.len());

        for pair in points.windows(2) {
            let dx = pair[0].x != pair[1].x;
            let dy = pair[0].y != pair[1].y;
            prop_assert!(dx ^ dy);
        }

        let plan = planner.plan();
        prop_assert_eq!(plan.iter().filter(|c| c.is_probe()).count(), points.len());
        prop_assert_eq!(
            plan.iter().filter(|c| c.intent == CommandIntent::ArcHop).count(),
            points.len() - 1
        );
        prop_assert_eq!(
            plan.iter().filter(|c| c.text == "G19").count(),
            y_rows - 1
        );
    }
}
