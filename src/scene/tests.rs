use super::*;
use crate::view::View;

fn approx(a: egui::Pos2, b: egui::Pos2) -> bool {
    (a - b).length() < 1e-3
}

fn drag(scene: &mut Scene, from: egui::Pos2, to: egui::Pos2) {
    scene.pointer_down(from, false);
    scene.pointer_move(from.lerp(to, 0.5));
    scene.pointer_move(to);
    scene.pointer_up(to);
}

/// Two shapes 400 apart, joined by a connector; commands drained.
fn connected_pair(scene: &mut Scene) -> (EntityId, EntityId, EntityId) {
    let a = scene.add_shape(FlowType::Process, egui::pos2(0.0, 0.0));
    let b = scene.add_shape(FlowType::Decision, egui::pos2(400.0, 0.0));
    let c = scene.connect(a, b).expect("distinct shapes");
    scene.take_commands();
    (a, b, c)
}

#[test]
fn insert_shape_mode_adds_shape_and_centered_label() {
    let mut scene = Scene::default();
    scene.set_mode(Mode::InsertShape(FlowType::StartOrEnd));
    scene.pointer_down(egui::pos2(100.0, 100.0), false);
    scene.pointer_up(egui::pos2(100.0, 100.0));

    assert_eq!(scene.mode(), Mode::Idle);
    assert_eq!(scene.shapes().len(), 1);
    assert_eq!(scene.labels().len(), 1);
    let shape = &scene.shapes()[0];
    let label = &scene.labels()[0];
    assert_eq!(shape.pos, egui::pos2(100.0, 100.0));
    assert_eq!(label.text, "Start or End");
    assert_eq!(label.anchor, Some(Anchor::Shape(shape.id)));
    assert!(approx(label.center(), shape.center()));

    let commands = scene.take_commands();
    assert!(matches!(&commands[..], [Command::Append(batch)] if batch.len() == 2));
}

#[test]
fn rubber_line_between_shapes_connects_them() {
    let mut scene = Scene::default();
    let a = scene.add_shape(FlowType::Process, egui::pos2(0.0, 0.0));
    let b = scene.add_shape(FlowType::Process, egui::pos2(400.0, 0.0));
    scene.take_commands();

    scene.shift_pressed();
    // Press on the shape body, away from its centered label.
    drag(&mut scene, egui::pos2(20.0, 20.0), egui::pos2(420.0, 20.0));
    assert_eq!(scene.mode(), Mode::InsertConnector);
    let c = &scene.connectors()[0];
    assert_eq!((c.start, c.end), (a, b));
    let route = c.route.expect("shapes do not overlap");
    assert!(approx(route.start, egui::pos2(160.0, 80.0)));
    assert!(approx(route.end, egui::pos2(400.0, 80.0)));
    assert_eq!(scene.take_commands().len(), 1);

    scene.shift_released();
    assert_eq!(scene.mode(), Mode::Idle);
}

#[test]
fn rubber_line_to_empty_space_or_same_shape_is_discarded() {
    let mut scene = Scene::default();
    scene.add_shape(FlowType::Process, egui::pos2(0.0, 0.0));
    scene.take_commands();
    scene.shift_pressed();
    drag(&mut scene, egui::pos2(20.0, 20.0), egui::pos2(900.0, 900.0));
    drag(&mut scene, egui::pos2(20.0, 20.0), egui::pos2(140.0, 20.0));
    assert!(scene.connectors().is_empty());
    assert!(scene.take_commands().is_empty());
}

#[test]
fn releasing_shift_drops_pending_line() {
    let mut scene = Scene::default();
    scene.add_shape(FlowType::Process, egui::pos2(0.0, 0.0));
    scene.add_shape(FlowType::Process, egui::pos2(400.0, 0.0));
    scene.take_commands();
    scene.shift_pressed();
    scene.pointer_down(egui::pos2(20.0, 20.0), false);
    scene.pointer_move(egui::pos2(420.0, 20.0));
    assert!(scene.rubber_line().is_some());
    scene.shift_released();
    assert!(scene.rubber_line().is_none());
    scene.pointer_up(egui::pos2(420.0, 20.0));
    assert!(scene.connectors().is_empty());
    assert!(scene.take_commands().is_empty());
}

#[test]
fn moving_a_shape_snaps_to_a_neighbour_edge() {
    let mut scene = Scene::default();
    scene.add_shape(FlowType::Process, egui::pos2(0.0, 0.0));
    let b = scene.add_shape(FlowType::Process, egui::pos2(300.0, 0.0));
    scene.take_commands();

    // Pressing b's label acts on b. Dragging left by 134 leaves a 6 unit gap
    // to the neighbour's right edge, which the guide closes.
    scene.pointer_down(egui::pos2(380.0, 80.0), false);
    assert!(scene.is_selected(b));
    scene.pointer_move(egui::pos2(246.0, 80.0));
    assert!(scene.guides().iter().any(|g| g.axis == Axis::Vertical && g.coord == 160.0));
    scene.pointer_up(egui::pos2(246.0, 80.0));

    let shape = scene.shape(b).expect("shape");
    assert_eq!(shape.pos, egui::pos2(160.0, 0.0));
    assert!(scene.guides().is_empty());
    let label = scene.label(scene.labels_of(b)[0]).expect("label");
    assert!(approx(label.center(), shape.center()));
    match &scene.take_commands()[..] {
        [Command::Move(moves)] => {
            assert_eq!(moves.len(), 1);
            assert_eq!(moves[0].from, egui::pos2(300.0, 0.0));
            assert_eq!(moves[0].to, egui::pos2(160.0, 0.0));
        }
        other => panic!("expected one move, got {other:?}"),
    }
}

#[test]
fn click_without_drag_records_no_move() {
    let mut scene = Scene::default();
    let a = scene.add_shape(FlowType::Process, egui::pos2(0.0, 0.0));
    scene.take_commands();
    scene.pointer_down(egui::pos2(20.0, 20.0), false);
    scene.pointer_up(egui::pos2(20.0, 20.0));
    assert!(scene.is_selected(a));
    assert!(scene.take_commands().is_empty());
}

#[test]
fn ctrl_click_toggles_and_empty_click_clears() {
    let mut scene = Scene::default();
    let a = scene.add_shape(FlowType::Process, egui::pos2(0.0, 0.0));
    let b = scene.add_shape(FlowType::Process, egui::pos2(400.0, 0.0));
    scene.pointer_down(egui::pos2(20.0, 20.0), false);
    scene.pointer_up(egui::pos2(20.0, 20.0));
    scene.pointer_down(egui::pos2(420.0, 20.0), true);
    scene.pointer_up(egui::pos2(420.0, 20.0));
    assert!(scene.is_selected(a) && scene.is_selected(b));
    scene.pointer_down(egui::pos2(420.0, 20.0), true);
    scene.pointer_up(egui::pos2(420.0, 20.0));
    assert!(!scene.is_selected(b));
    scene.pointer_down(egui::pos2(1000.0, 1000.0), false);
    scene.pointer_up(egui::pos2(1000.0, 1000.0));
    assert!(scene.selected().is_empty());
}

#[test]
fn rubber_band_selects_touched_entities() {
    let mut scene = Scene::default();
    let (a, b, _) = connected_pair(&mut scene);
    drag(&mut scene, egui::pos2(-50.0, -50.0), egui::pos2(100.0, 100.0));
    assert!(scene.is_selected(a));
    assert!(!scene.is_selected(b));
    assert!(scene.take_commands().is_empty());
}

#[test]
fn locked_shape_ignores_clicks_and_rubber_band() {
    let mut scene = Scene::default();
    let a = scene.add_shape(FlowType::Process, egui::pos2(0.0, 0.0));
    scene.take_commands();
    if let Some(shape) = scene.shapes.iter_mut().find(|s| s.id == a) {
        shape.selectable = false;
    }

    scene.pointer_down(egui::pos2(20.0, 20.0), false);
    scene.pointer_up(egui::pos2(20.0, 20.0));
    assert!(!scene.is_selected(a));

    drag(&mut scene, egui::pos2(-50.0, -50.0), egui::pos2(100.0, 100.0));
    assert!(!scene.is_selected(a));
    assert_eq!(scene.shape(a).expect("shape").pos, egui::pos2(0.0, 0.0));
    assert!(scene.take_commands().is_empty());
}

#[test]
fn bottom_handle_rotates_and_records_one_change() {
    let mut scene = Scene::default();
    let a = scene.add_shape(FlowType::Process, egui::pos2(0.0, 0.0));
    scene.take_commands();
    scene.select_only(a);
    let before = scene.shape(a).expect("shape").transform;

    scene.pointer_down(egui::pos2(80.0, 150.0), false);
    scene.pointer_move(egui::pos2(200.0, 100.0));
    assert!(scene.control_preview().is_some());
    // Nothing changes until release.
    assert_eq!(scene.shape(a).expect("shape").transform, before);
    scene.pointer_up(egui::pos2(230.0, 80.0));

    let after = scene.shape(a).expect("shape").transform;
    let expected = control_point::drag_transform(
        Direction::BottomCenter,
        &before,
        scene.shape(a).expect("shape").local_rect(),
        egui::pos2(8.0, 15.0),
        egui::pos2(23.0, 8.0),
        5.0,
    )
    .expect("rotation");
    assert_eq!(after, expected);
    let commands = scene.take_commands();
    assert!(matches!(
        &commands[..],
        [Command::TransformChange { id, old, .. }] if *id == a && *old == before
    ));

    let mut view = View::default();
    commands[0].undo(&mut scene, &mut view);
    assert_eq!(scene.shape(a).expect("shape").transform, before);
}

#[test]
fn pixmap_corner_drag_resizes_with_aspect() {
    let mut scene = Scene::default();
    let id = scene.add_pixmap(Pixmap::new(
        "picture.png".into(),
        egui::vec2(100.0, 50.0),
        egui::pos2(0.0, 0.0),
    ));
    scene.take_commands();
    scene.select_only(id);
    drag(&mut scene, egui::pos2(95.0, 45.0), egui::pos2(195.0, 145.0));
    let px = scene.pixmap(id).expect("pixmap");
    assert_eq!(px.pos, egui::pos2(0.0, 0.0));
    assert_eq!(px.size, egui::vec2(200.0, 100.0));
    assert!(matches!(
        &scene.take_commands()[..],
        [Command::ResizeImage { old, new, .. }]
            if *old == egui::vec2(100.0, 50.0) && *new == egui::vec2(200.0, 100.0)
    ));
}

#[test]
fn pixmap_never_shrinks_below_min_edge() {
    let mut scene = Scene::default();
    let id = scene.add_pixmap(Pixmap::new(
        "picture.png".into(),
        egui::vec2(100.0, 100.0),
        egui::pos2(0.0, 0.0),
    ));
    scene.take_commands();
    scene.select_only(id);
    scene.pointer_down(egui::pos2(95.0, 95.0), false);
    scene.pointer_move(egui::pos2(35.0, 35.0));
    scene.pointer_up(egui::pos2(35.0, 35.0));
    assert_eq!(scene.pixmap(id).expect("pixmap").size, egui::vec2(100.0, 100.0));
    assert!(scene.take_commands().is_empty());
}

#[test]
fn deleting_an_endpoint_cascades_and_undo_restores() {
    let mut scene = Scene::default();
    let (a, b, c) = connected_pair(&mut scene);
    scene.double_click(egui::pos2(280.0, 80.0));
    let connector_label = scene.labels_of(c)[0];
    scene.escape();
    scene.take_commands();
    let before_labels = scene.labels().to_vec();

    scene.select_only(a);
    assert_eq!(scene.delete_selection(), 4);
    assert!(scene.shape(a).is_none());
    assert!(scene.connector(c).is_none());
    assert!(scene.label(connector_label).is_none());
    assert_eq!(scene.shapes().len(), 1);
    assert_eq!(scene.labels().len(), 1);

    let commands = scene.take_commands();
    let mut view = View::default();
    commands[0].undo(&mut scene, &mut view);
    assert_eq!(scene.shapes()[0].id, a);
    assert_eq!(scene.shapes()[1].id, b);
    assert!(scene.connector(c).is_some_and(|c| c.route.is_some()));
    assert_eq!(scene.labels(), &before_labels[..]);
    assert_eq!(scene.labels_of(c), &[connector_label]);
}

#[test]
fn double_click_on_connector_adds_centered_label_in_edit() {
    let mut scene = Scene::default();
    let (_, _, c) = connected_pair(&mut scene);
    scene.double_click(egui::pos2(280.0, 80.0));
    let label_id = scene.labels_of(c)[0];
    let label = scene.label(label_id).expect("label");
    assert!(label.is_editing());
    assert!(approx(label.center(), egui::pos2(280.0, 80.0)));
    assert!(matches!(&scene.take_commands()[..], [Command::Append(batch)] if batch.len() == 1));

    // A second double click focuses the same label.
    scene.escape();
    scene.double_click(egui::pos2(200.0, 80.0));
    assert_eq!(scene.labels_of(c).len(), 1);
    assert_eq!(scene.editing_label(), Some(label_id));
}

#[test]
fn leaving_edit_commits_changed_text_only() {
    let mut scene = Scene::default();
    let a = scene.add_shape(FlowType::Process, egui::pos2(0.0, 0.0));
    let label = scene.labels_of(a)[0];
    scene.take_commands();

    scene.double_click(egui::pos2(20.0, 20.0));
    assert_eq!(scene.editing_label(), Some(label));
    scene.escape();
    assert!(scene.take_commands().is_empty());

    scene.begin_edit(label);
    scene.set_draft(label, "Check stock".to_string());
    assert!(approx(scene.label(label).expect("label").center(), egui::pos2(80.0, 80.0)));
    scene.pointer_down(egui::pos2(1000.0, 1000.0), false);
    scene.pointer_up(egui::pos2(1000.0, 1000.0));
    assert_eq!(scene.label(label).expect("label").text, "Check stock");
    assert!(matches!(
        &scene.take_commands()[..],
        [Command::ReplaceText(changes)] if changes[0].old == "Process"
    ));
}

#[test]
fn recolor_records_old_and_new_style() {
    let mut scene = Scene::default();
    let a = scene.add_shape(FlowType::Decision, egui::pos2(0.0, 0.0));
    scene.take_commands();
    scene.select_only(a);
    let path = scene.shape(a).expect("shape").style_path();

    assert_eq!(scene.recolor_selected(Some(FillColor::Yellow), None), 1);
    assert_eq!(scene.recolor_selected(None, Some(BorderColor::Red)), 1);
    assert_eq!(scene.shape(a).expect("shape").style_path(), "flowchart/fc-4-ry.svg");
    // Setting the same color again is not a change.
    assert_eq!(scene.recolor_selected(Some(FillColor::Yellow), None), 1);

    let commands = scene.take_commands();
    assert_eq!(commands.len(), 2);
    let mut view = View::default();
    for c in commands.iter().rev() {
        c.undo(&mut scene, &mut view);
    }
    assert_eq!(scene.shape(a).expect("shape").style_path(), path);
}

#[test]
fn label_restyle_keeps_anchored_label_centered() {
    let mut scene = Scene::default();
    let a = scene.add_shape(FlowType::Process, egui::pos2(0.0, 0.0));
    let label = scene.labels_of(a)[0];
    scene.take_commands();
    scene.select_only(label);
    let font = FontSpec {
        size: 24.0,
        ..FontSpec::default()
    };
    assert_eq!(scene.restyle_selected_labels(Some(font.clone()), None), 1);
    let l = scene.label(label).expect("label");
    assert_eq!(l.font, font);
    assert!(approx(l.center(), egui::pos2(80.0, 80.0)));
    assert!(matches!(&scene.take_commands()[..], [Command::FontOrColorChange(c)] if c.len() == 1));
}

#[test]
fn overlapping_shapes_hide_connector() {
    let mut scene = Scene::default();
    let (_, b, c) = connected_pair(&mut scene);
    scene.set_position(b, egui::pos2(100.0, 0.0));
    scene.refresh();
    assert!(scene.connector(c).expect("connector").route.is_none());
}
