// SPDX-License-Identifier: MIT OR Apache-2.0
//! Evaluation scenarios over small calculator graphs: propagation of input
//! changes, caching, dirty marking and recovery from invalid inputs.

mod common;
use common::*;

#[cfg(test)]
mod evaluation_tests {
    use super::*;
    use nodeflow_graph::graphs::calculator::{
        set_input_value, OP_NODE_DIV, OP_NODE_INPUT, OP_NODE_OUTPUT,
    };
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_input_change_reaches_output() {
        let mut scene = calc_scene();
        let seen = record_outputs(&mut scene);

        let a = spawn_input(&mut scene, 5.0, 0.0, 0.0);
        let double = spawn_at(&mut scene, OP_DOUBLE, 250.0, 0.0);
        let out = spawn_at(&mut scene, OP_NODE_OUTPUT, 500.0, 0.0);
        link(&mut scene, a, double, 0);
        link(&mut scene, double, out, 0);

        assert_eq!(scene.node(out).unwrap().display_value(), "10");
        assert_eq!(seen.borrow().last().unwrap(), &(out, "10".to_string()));

        assert!(set_input_value(&mut scene, a, 7.0));
        assert_eq!(scene.node(out).unwrap().display_value(), "14");
        assert_eq!(scene.node(out).unwrap().text(), "2 * 7 = 14");
        assert_eq!(seen.borrow().last().unwrap(), &(out, "14".to_string()));
    }

    #[test]
    fn test_disconnect_resets_output() {
        let mut scene = calc_scene();
        let a = spawn_input(&mut scene, 3.0, 0.0, 0.0);
        let out = spawn_at(&mut scene, OP_NODE_OUTPUT, 300.0, 0.0);
        let edge = link(&mut scene, a, out, 0);
        assert_eq!(scene.node(out).unwrap().display_value(), "3");

        let seen = record_outputs(&mut scene);
        assert!(scene.remove_edge(edge));

        let node = scene.node(out).unwrap();
        assert!(node.is_invalid());
        assert_eq!(node.display_value(), "0");
        assert_eq!(seen.borrow().as_slice(), &[(out, "0".to_string())]);
    }

    #[test]
    fn test_clean_node_uses_cache() {
        let mut scene = calc_scene();
        let calls = Rc::new(Cell::new(0));
        let a = spawn_input(&mut scene, 2.0, 0.0, 0.0);
        let counting = scene.add_node(
            &double_template(),
            Box::new(Counting {
                calls: Rc::clone(&calls),
            }),
        );
        link(&mut scene, a, counting, 0);

        let before = calls.get();
        assert!(before >= 1);
        let evaluation = scene.eval(counting).unwrap();
        assert_eq!(evaluation.value, 4.0);
        assert_eq!(calls.get(), before);

        set_input_value(&mut scene, a, 3.0);
        assert_eq!(calls.get(), before + 1);
        assert_eq!(scene.node(counting).unwrap().value(), Some(6.0));
    }

    #[test]
    fn test_mark_dirty_reaches_descendants_only() {
        let mut scene = calc_scene();
        let a = spawn_input(&mut scene, 5.0, 0.0, 0.0);
        let b = spawn_at(&mut scene, OP_DOUBLE, 250.0, 0.0);
        let c = spawn_at(&mut scene, OP_NODE_OUTPUT, 500.0, 0.0);
        let lone = spawn_at(&mut scene, OP_NODE_INPUT, 0.0, 300.0);
        link(&mut scene, a, b, 0);
        link(&mut scene, b, c, 0);
        scene.evaluate_all();
        assert!(scene.nodes().all(|n| !n.is_dirty()));

        scene.mark_dirty(b, true);
        assert!(!scene.node(a).unwrap().is_dirty());
        assert!(scene.node(b).unwrap().is_dirty());
        assert!(scene.node(c).unwrap().is_dirty());
        assert!(!scene.node(lone).unwrap().is_dirty());

        scene.evaluate_all();
        assert!(scene.nodes().all(|n| !n.is_dirty()));
        assert_eq!(scene.node(c).unwrap().display_value(), "10");
    }

    #[test]
    fn test_invalid_input_recovers() {
        let mut scene = calc_scene();
        let a = spawn_input(&mut scene, 1.0, 0.0, 0.0);
        let divisor = spawn_input(&mut scene, 0.0, 0.0, 200.0);
        let div = spawn_at(&mut scene, OP_NODE_DIV, 250.0, 100.0);
        let out = spawn_at(&mut scene, OP_NODE_OUTPUT, 500.0, 100.0);
        link(&mut scene, a, div, 0);
        link(&mut scene, divisor, div, 1);
        link(&mut scene, div, out, 0);

        assert!(scene.node(div).unwrap().is_invalid());
        assert_eq!(scene.node(out).unwrap().display_value(), "0");

        set_input_value(&mut scene, divisor, 4.0);
        assert!(!scene.node(div).unwrap().is_invalid());
        assert_eq!(scene.node(out).unwrap().display_value(), "0.25");
        assert_eq!(scene.node(out).unwrap().text(), "(1 / 4) = 0.25");
    }

    #[test]
    fn test_children_follow_output_edges() {
        let mut scene = calc_scene();
        let a = spawn_input(&mut scene, 1.0, 0.0, 0.0);
        let b = spawn_at(&mut scene, OP_DOUBLE, 250.0, 0.0);
        let c = spawn_at(&mut scene, OP_NODE_OUTPUT, 250.0, 200.0);
        link(&mut scene, a, b, 0);
        link(&mut scene, a, c, 0);

        assert_eq!(scene.children(a), vec![b, c]);
        assert!(scene.children(b).is_empty());
        assert_eq!(scene.get_input(b, 0), Some(a));
        assert_eq!(scene.get_input(b, 1), None);
    }
}
