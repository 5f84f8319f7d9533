// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editing scenarios driven through the pointer state machine, plus undo
//! and redo of the resulting history.

mod common;
use common::*;

#[cfg(test)]
mod editing_tests {
    use super::*;
    use egui::{pos2, vec2, Pos2};
    use nodeflow_graph::graphs::calculator::{set_input_value, OP_NODE_OUTPUT};
    use nodeflow_graph::{
        EdgeType, Gesture, HistoryError, HitTarget, InteractionMode, InteractionState, Modifiers,
        PointerEvent, Scene, SceneItem,
    };

    fn press(
        state: &mut InteractionState,
        scene: &mut Scene,
        pos: Pos2,
        hit: HitTarget,
        modifiers: Modifiers,
    ) -> Gesture {
        state.pointer_down(scene, PointerEvent::new(pos, hit).with_modifiers(modifiers))
    }

    #[test]
    fn test_drop_node_on_edge_splits_it() {
        let mut scene = calc_scene();
        let x = spawn_input(&mut scene, 5.0, 0.0, 0.0);
        let y = spawn_at(&mut scene, OP_NODE_OUTPUT, 600.0, 0.0);
        let original = link_with(&mut scene, x, y, 0, EdgeType::Square);
        let middle = spawn_at(&mut scene, OP_DOUBLE, 300.0, 300.0);
        scene.store_initial_history_stamp();

        let x_out = scene.node(x).unwrap().outputs()[0].id;
        let line_y = scene.socket_scene_position(x_out).unwrap().y;

        let mut state = InteractionState::default();
        let start = pos2(310.0, 310.0);
        press(&mut state, &mut scene, start, HitTarget::Node(middle), Modifiers::default());
        assert!(scene.is_selected(SceneItem::Node(middle)));

        // Put the edge 30 px below the top of the node box
        let end = start + vec2(0.0, line_y - 30.0 - 300.0);
        state.pointer_move(&mut scene, PointerEvent::new(end, HitTarget::Node(middle)));
        assert_eq!(state.hovered_edges(), &[original]);

        let gesture = state.pointer_up(&mut scene, PointerEvent::new(end, HitTarget::Node(middle)));
        assert_eq!(gesture, Gesture::NodeDroppedOnEdge(original));

        assert!(scene.edge(original).is_none());
        assert_eq!(scene.edge_count(), 2);
        assert!(scene.edges().all(|edge| edge.edge_type == EdgeType::Square));
        assert_eq!(scene.get_input(middle, 0), Some(x));
        assert_eq!(scene.get_input(y, 0), Some(middle));
        assert_eq!(scene.node(y).unwrap().display_value(), "10");

        let descriptions = history_descriptions(&scene);
        assert_eq!(
            &descriptions[descriptions.len() - 3..],
            &[
                "Node moved".to_string(),
                "Delete existing edge".to_string(),
                "Created new edges by dropping node".to_string(),
            ]
        );
    }

    #[test]
    fn test_cut_line_removes_crossed_edges() {
        let mut scene = calc_scene();
        let x = spawn_input(&mut scene, 5.0, 0.0, 0.0);
        let y = spawn_at(&mut scene, OP_NODE_OUTPUT, 600.0, 0.0);
        link(&mut scene, x, y, 0);
        scene.store_initial_history_stamp();
        let mut state = InteractionState::default();

        // A cut far away from the edge changes nothing
        press(&mut state, &mut scene, pos2(380.0, 400.0), HitTarget::None, Modifiers::CTRL);
        state.pointer_move(&mut scene, PointerEvent::new(pos2(390.0, 500.0), HitTarget::None));
        let gesture = state.pointer_up(&mut scene, PointerEvent::new(pos2(400.0, 600.0), HitTarget::None));
        assert_eq!(gesture, Gesture::Cancelled);
        assert_eq!(scene.edge_count(), 1);
        assert_eq!(scene.history().len(), 1);

        press(&mut state, &mut scene, pos2(380.0, -100.0), HitTarget::None, Modifiers::CTRL);
        state.pointer_move(&mut scene, PointerEvent::new(pos2(380.0, 0.0), HitTarget::None));
        let gesture = state.pointer_up(&mut scene, PointerEvent::new(pos2(380.0, 200.0), HitTarget::None));

        assert_eq!(gesture, Gesture::EdgesCut(1));
        assert_eq!(scene.edge_count(), 0);
        assert_eq!(scene.node(y).unwrap().display_value(), "0");
        assert_eq!(history_descriptions(&scene).last().unwrap(), "Delete cutted edges");
    }

    #[test]
    fn test_reroute_moves_all_edges_of_a_socket() {
        let mut scene = calc_scene();
        let a = spawn_input(&mut scene, 1.0, 0.0, 0.0);
        let b = spawn_input(&mut scene, 8.0, 0.0, 300.0);
        let first = spawn_at(&mut scene, OP_NODE_OUTPUT, 400.0, 0.0);
        let second = spawn_at(&mut scene, OP_NODE_OUTPUT, 400.0, 300.0);
        link(&mut scene, a, first, 0);
        link(&mut scene, a, second, 0);

        let a_out = scene.node(a).unwrap().outputs()[0].id;
        let b_out = scene.node(b).unwrap().outputs()[0].id;
        let a_pos = scene.socket_scene_position(a_out).unwrap();
        let b_pos = scene.socket_scene_position(b_out).unwrap();

        let mut state = InteractionState::default();
        press(&mut state, &mut scene, a_pos, HitTarget::Socket(a_out), Modifiers::CTRL);
        state.pointer_move(&mut scene, PointerEvent::new(b_pos, HitTarget::Socket(b_out)));
        let gesture = state.pointer_up(&mut scene, PointerEvent::new(b_pos, HitTarget::Socket(b_out)));

        assert_eq!(gesture, Gesture::EdgesRerouted(2));
        assert!(!scene.socket(a_out).unwrap().has_any_edge());
        assert_eq!(scene.socket(b_out).unwrap().edges().len(), 2);
        assert_eq!(scene.node(first).unwrap().display_value(), "8");
        assert_eq!(scene.node(second).unwrap().display_value(), "8");
        assert_eq!(history_descriptions(&scene).last().unwrap(), "Rerouted edges");
    }

    #[test]
    fn test_reroute_snaps_to_nearby_socket_while_ctrl_held() {
        let mut scene = calc_scene();
        let a = spawn_input(&mut scene, 1.0, 0.0, 0.0);
        let b = spawn_input(&mut scene, 8.0, 0.0, 300.0);
        let out = spawn_at(&mut scene, OP_NODE_OUTPUT, 400.0, 0.0);
        link(&mut scene, a, out, 0);

        let a_out = scene.node(a).unwrap().outputs()[0].id;
        let b_out = scene.node(b).unwrap().outputs()[0].id;
        let a_pos = scene.socket_scene_position(a_out).unwrap();
        let b_pos = scene.socket_scene_position(b_out).unwrap();
        let near = b_pos + vec2(10.0, 5.0);

        let mut state = InteractionState::default();
        press(&mut state, &mut scene, a_pos, HitTarget::Socket(a_out), Modifiers::CTRL);
        let held = PointerEvent::new(near, HitTarget::None).with_modifiers(Modifiers::CTRL);
        state.pointer_move(&mut scene, held);
        let InteractionMode::EdgesRerouting(reroute) = state.mode() else {
            panic!("expected rerouting, got {:?}", state.mode());
        };
        assert_eq!(reroute.snapped, Some(b_out));
        assert_eq!(reroute.pointer, b_pos);

        let gesture = state.pointer_up(&mut scene, held);
        assert_eq!(gesture, Gesture::EdgesRerouted(1));
        assert!(!scene.socket(a_out).unwrap().has_any_edge());
        assert_eq!(scene.get_input(out, 0), Some(b));
        assert_eq!(scene.node(out).unwrap().display_value(), "8");
    }

    #[test]
    fn test_reroute_released_off_socket_without_ctrl_is_cancelled() {
        let mut scene = calc_scene();
        let a = spawn_input(&mut scene, 1.0, 0.0, 0.0);
        let b = spawn_input(&mut scene, 8.0, 0.0, 300.0);
        let out = spawn_at(&mut scene, OP_NODE_OUTPUT, 400.0, 0.0);
        link(&mut scene, a, out, 0);

        let a_out = scene.node(a).unwrap().outputs()[0].id;
        let b_out = scene.node(b).unwrap().outputs()[0].id;
        let a_pos = scene.socket_scene_position(a_out).unwrap();
        let near = scene.socket_scene_position(b_out).unwrap() + vec2(10.0, 5.0);

        let mut state = InteractionState::default();
        press(&mut state, &mut scene, a_pos, HitTarget::Socket(a_out), Modifiers::CTRL);
        let gesture = state.pointer_up(&mut scene, PointerEvent::new(near, HitTarget::None));

        assert_eq!(gesture, Gesture::Cancelled);
        assert_eq!(scene.get_input(out, 0), Some(a));
    }

    #[test]
    fn test_reroute_onto_occupied_input_is_cancelled() {
        let mut scene = calc_scene();
        let a = spawn_input(&mut scene, 1.0, 0.0, 0.0);
        let b = spawn_input(&mut scene, 2.0, 0.0, 300.0);
        let first = spawn_at(&mut scene, OP_NODE_OUTPUT, 400.0, 0.0);
        let second = spawn_at(&mut scene, OP_NODE_OUTPUT, 400.0, 300.0);
        let edge = link(&mut scene, a, first, 0);
        link(&mut scene, b, second, 0);

        let first_in = scene.node(first).unwrap().inputs()[0].id;
        let second_in = scene.node(second).unwrap().inputs()[0].id;
        let from = scene.socket_scene_position(first_in).unwrap();
        let to = scene.socket_scene_position(second_in).unwrap();

        let mut state = InteractionState::default();
        press(&mut state, &mut scene, from, HitTarget::Socket(first_in), Modifiers::CTRL);
        let gesture = state.pointer_up(&mut scene, PointerEvent::new(to, HitTarget::Socket(second_in)));

        assert_eq!(gesture, Gesture::Cancelled);
        assert_eq!(scene.edge(edge).unwrap().end, first_in);
        assert_eq!(scene.node(first).unwrap().display_value(), "1");
        assert_eq!(scene.node(second).unwrap().display_value(), "2");
    }

    #[test]
    fn test_snapping_drag_connects_to_nearby_socket() {
        let mut scene = calc_scene();
        let x = spawn_input(&mut scene, 4.0, 0.0, 0.0);
        let y = spawn_at(&mut scene, OP_NODE_OUTPUT, 600.0, 0.0);
        let x_out = scene.node(x).unwrap().outputs()[0].id;
        let y_in = scene.node(y).unwrap().inputs()[0].id;
        let start = scene.socket_scene_position(x_out).unwrap();
        let near = scene.socket_scene_position(y_in).unwrap() + vec2(6.0, 4.0);

        let mut state = InteractionState::default();
        press(&mut state, &mut scene, start, HitTarget::Socket(x_out), Modifiers::CTRL);
        state.pointer_move(&mut scene, PointerEvent::new(near, HitTarget::None));
        let gesture = state.pointer_up(&mut scene, PointerEvent::new(near, HitTarget::None));

        let Gesture::EdgeCreated(edge) = gesture else {
            panic!("expected an edge, got {gesture:?}");
        };
        let edge = scene.edge(edge).unwrap();
        assert_eq!((edge.start, edge.end), (x_out, y_in));
        assert_eq!(scene.node(y).unwrap().display_value(), "4");
        assert_eq!(history_descriptions(&scene).last().unwrap(), "Created new edge by dragging");
    }

    #[test]
    fn test_undo_redo_restores_values_and_selection() {
        let mut scene = calc_scene();
        scene.store_initial_history_stamp();
        assert!(!scene.can_undo());

        let a = spawn_input(&mut scene, 5.0, 0.0, 0.0);
        let out = spawn_at(&mut scene, OP_NODE_OUTPUT, 300.0, 0.0);
        link(&mut scene, a, out, 0);
        scene.select(SceneItem::Node(a), false);
        scene.store_history("Connected", true);

        set_input_value(&mut scene, a, 9.0);
        scene.clear_selection();
        scene.store_history("Changed value", true);
        assert_eq!(scene.node(out).unwrap().display_value(), "9");

        scene.undo().unwrap();
        assert_eq!(scene.node(out).unwrap().display_value(), "5");
        assert_eq!(scene.selected_nodes(), vec![a]);
        assert!(scene.is_modified());

        scene.undo().unwrap();
        assert_eq!(scene.node_count(), 0);
        assert!(matches!(scene.undo(), Err(HistoryError::NothingToUndo)));

        scene.redo().unwrap();
        scene.redo().unwrap();
        assert_eq!(scene.node(out).unwrap().display_value(), "9");
        assert!(scene.selected_nodes().is_empty());
        assert!(matches!(scene.redo(), Err(HistoryError::NothingToRedo)));
    }

    #[test]
    fn test_new_stamp_drops_redo_tail() {
        let mut scene = calc_scene();
        scene.store_initial_history_stamp();
        spawn_at(&mut scene, OP_NODE_OUTPUT, 0.0, 0.0);
        scene.store_history("First", true);
        scene.undo().unwrap();
        assert!(scene.can_redo());

        spawn_at(&mut scene, OP_DOUBLE, 0.0, 0.0);
        scene.store_history("Second", true);
        assert!(!scene.can_redo());
        assert_eq!(
            history_descriptions(&scene),
            vec!["Initial History Stamp".to_string(), "Second".to_string()]
        );
    }

    #[test]
    fn test_delete_selected_can_be_undone() {
        let mut scene = calc_scene();
        let a = spawn_input(&mut scene, 3.0, 0.0, 0.0);
        let out = spawn_at(&mut scene, OP_NODE_OUTPUT, 300.0, 0.0);
        link(&mut scene, a, out, 0);
        scene.store_initial_history_stamp();

        scene.select(SceneItem::Node(a), false);
        assert_eq!(scene.delete_selected(), 1);
        assert_eq!(scene.edge_count(), 0);
        assert_eq!(scene.node(out).unwrap().display_value(), "0");

        scene.undo().unwrap();
        assert_eq!(scene.node_count(), 2);
        assert_eq!(scene.edge_count(), 1);
        assert_eq!(scene.node(out).unwrap().display_value(), "3");
    }
}
