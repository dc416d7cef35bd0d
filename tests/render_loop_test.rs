use std::{cell::RefCell, rc::Rc, time::Duration};

use futures::{executor::LocalPool, task::LocalSpawnExt};
use gltf_stage::{
    attach::{LoadStatus, MODELS},
    config::StageConfig,
    data_structures::scene_graph::Scene,
    resources::{LoadedModel, animation::AnimationMixer},
    stage::Stage,
    viewport::Sizes,
};

use crate::common::test_utils::{
    ChannelLoader, CountingControls, RecordingRenderer, animated_model, assert_close, loaded_model,
};

mod common;

fn new_stage() -> Stage {
    Stage::new(StageConfig::default(), Sizes::new(800, 600))
}

fn index_of(name: &str) -> usize {
    MODELS.iter().position(|spec| spec.name == name).unwrap()
}

fn path_of(name: &str) -> &'static str {
    MODELS[index_of(name)].path
}

fn robot_body_x(stage: &Stage) -> f32 {
    let LoadStatus::Attached(id) = stage.loads()[index_of("robot")] else {
        panic!("robot is not attached");
    };
    let robot = stage.scene().get(id).unwrap();
    robot.get_children()[0].get_local_transform().position.x
}

#[test]
fn should_start_with_floor_and_lights_only() {
    let stage = new_stage();

    assert_eq!(stage.scene().len(), 3);
    assert!(stage.scene().find_top_level("floor").is_some());
    assert!(stage.scene().find_top_level("hemisphere-light").is_some());
    assert!(stage.scene().find_top_level("directional-light").is_some());
    assert!(stage.mixer().is_none());
    assert!(stage.loads().is_empty());
}

#[test]
fn should_update_controls_before_rendering() {
    let mut stage = new_stage();
    let mut controls = CountingControls {
        updates: 0,
        step: 1.0,
    };
    let mut renderer = RecordingRenderer::default();

    stage.tick(&mut controls, &mut renderer, Duration::from_millis(16));
    stage.tick(&mut controls, &mut renderer, Duration::from_millis(16));

    assert_eq!(controls.updates, 2);
    assert_eq!(renderer.frames.len(), 2);
    // the renderer sees the camera after this frame's control update
    assert_close(renderer.frames[0].camera_position[0], 71.0);
    assert_close(renderer.frames[1].camera_position[0], 72.0);
}

#[test]
fn should_render_without_a_mixer() {
    let mut stage = new_stage();
    let mut renderer = RecordingRenderer::default();

    stage.tick(&mut CountingControls::default(), &mut renderer, Duration::from_secs(1));

    assert_eq!(renderer.frames.len(), 1);
    assert_eq!(renderer.frames[0].top_level_nodes, 3);
    assert!(stage.mixer().is_none());
}

#[test]
fn should_advance_the_mixer_by_half_the_frame_delta() {
    let mut stage = new_stage();
    let loader = ChannelLoader::default();
    drop(stage.issue_loads(&loader));
    stage.on_model_loaded(index_of("robot"), Ok(animated_model()));
    let mut renderer = RecordingRenderer::default();

    stage.tick(&mut CountingControls::default(), &mut renderer, Duration::from_secs(1));

    let mixer = stage.mixer().expect("robot binds the mixer");
    assert_close(mixer.time(), 0.5);
    assert_close(mixer.actions()[0].time(), 0.5);
    // walk moves x from 0 to 1 over two seconds
    assert_close(robot_body_x(&stage), 0.25);
}

#[test]
fn should_draw_the_frame_before_advancing_the_animation() {
    let mut stage = new_stage();
    let loader = ChannelLoader::default();
    drop(stage.issue_loads(&loader));
    stage.on_model_loaded(index_of("robot"), Ok(animated_model()));
    let mut controls = CountingControls::default();
    let mut renderer = RecordingRenderer::default();

    stage.tick(&mut controls, &mut renderer, Duration::from_secs(1));
    assert_close(robot_body_x(&stage), 0.25);
    stage.tick(&mut controls, &mut renderer, Duration::from_secs(1));

    assert_close(robot_body_x(&stage), 0.5);
    assert_eq!(renderer.frames.len(), 2);
}

#[test]
fn should_attach_models_in_completion_order() {
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    let stage = Rc::new(RefCell::new(new_stage()));
    let loader = ChannelLoader::default();
    let completed: Rc<RefCell<Vec<usize>>> = Rc::default();

    let loads = stage.borrow_mut().issue_loads(&loader);
    assert_eq!(loads.len(), 4);
    assert_eq!(*loader.requested.borrow(), MODELS.iter().map(|spec| spec.path).collect::<Vec<_>>());

    for (index, load) in loads {
        let stage = stage.clone();
        let completed = completed.clone();
        spawner
            .spawn_local(async move {
                let result = load.await;
                completed.borrow_mut().push(index);
                stage.borrow_mut().on_model_loaded(index, result);
            })
            .unwrap();
    }
    pool.run_until_stalled();
    assert!(completed.borrow().is_empty());
    assert!(!stage.borrow().is_ready());

    loader.complete(path_of("robot"), Ok(animated_model()));
    pool.run_until_stalled();
    assert!(stage.borrow().mixer().is_some());
    assert_eq!(stage.borrow().scene().len(), 4);

    loader.complete(path_of("helmet"), Ok(loaded_model(&["helmet"])));
    loader.complete(path_of("fox"), Ok(loaded_model(&["fox"])));
    loader.complete(path_of("dragon"), Ok(loaded_model(&["light", "dragon"])));
    pool.run_until_stalled();

    let order: Vec<usize> = completed.borrow().clone();
    assert_eq!(order.len(), 4);
    assert_eq!(order[0], index_of("robot"));
    let stage = stage.borrow();
    assert!(stage.is_ready());
    assert_eq!(stage.scene().len(), 7);
    assert!(stage.loads().iter().all(|status| matches!(status, LoadStatus::Attached(_))));
}

#[test]
fn should_replace_a_failed_model_with_a_placeholder() {
    let mut stage = new_stage();
    let loader = ChannelLoader::default();
    drop(stage.issue_loads(&loader));

    stage.on_model_loaded(index_of("fox"), Err(anyhow::anyhow!("404 Not Found")));

    assert!(stage.scene().find_top_level("fox-placeholder").is_some());
    match &stage.loads()[index_of("fox")] {
        LoadStatus::Failed(reason) => assert!(reason.contains("404")),
        other => panic!("expected a failure, got {:?}", other),
    }
    assert!(!stage.is_ready());

    // the other models still load
    stage.on_model_loaded(index_of("dragon"), Ok(loaded_model(&["light", "dragon"])));
    stage.on_model_loaded(index_of("helmet"), Ok(loaded_model(&["helmet"])));
    stage.on_model_loaded(index_of("robot"), Ok(animated_model()));
    assert!(stage.is_ready());
    assert!(stage.mixer().is_some());
}

#[test]
fn should_use_a_placeholder_when_the_selected_child_is_missing() {
    let mut stage = new_stage();
    let loader = ChannelLoader::default();
    drop(stage.issue_loads(&loader));

    stage.on_model_loaded(index_of("dragon"), Ok(loaded_model(&["only-one"])));

    assert!(stage.scene().find_top_level("dragon-placeholder").is_some());
    assert!(matches!(stage.loads()[index_of("dragon")], LoadStatus::Failed(_)));
}

#[test]
fn should_keep_the_robot_frozen_when_its_load_fails() {
    let mut stage = new_stage();
    let loader = ChannelLoader::default();
    drop(stage.issue_loads(&loader));
    stage.on_model_loaded(index_of("robot"), Err(anyhow::anyhow!("bad glTF")));
    let mut renderer = RecordingRenderer::default();

    stage.tick(&mut CountingControls::default(), &mut renderer, Duration::from_secs(1));

    assert!(stage.mixer().is_none());
    assert_eq!(renderer.frames.len(), 1);
}

#[test]
fn should_ignore_a_second_mixer() {
    let mut stage = new_stage();
    let loader = ChannelLoader::default();
    drop(stage.issue_loads(&loader));
    stage.on_model_loaded(index_of("robot"), Ok(animated_model()));
    let bound = stage.mixer().unwrap().root();

    let mut scene = Scene::new();
    let other = scene.add(loaded_model(&["other"]).scene);
    assert!(!stage.bind_mixer(AnimationMixer::new(other)));

    assert_eq!(stage.mixer().unwrap().root(), bound);
}

#[test]
fn should_ignore_duplicate_and_unknown_completions() {
    let mut stage = new_stage();
    let loader = ChannelLoader::default();
    drop(stage.issue_loads(&loader));

    stage.on_model_loaded(index_of("fox"), Ok(loaded_model(&["fox"])));
    stage.on_model_loaded(index_of("fox"), Ok(loaded_model(&["fox"])));
    stage.on_model_loaded(MODELS.len() + 3, Ok(loaded_model(&["stray"])));

    // floor, two lights and one fox
    assert_eq!(stage.scene().len(), 4);
}

#[test]
fn should_drop_results_for_loads_that_were_never_issued() {
    let mut stage = new_stage();
    let result: anyhow::Result<LoadedModel> = Ok(loaded_model(&["fox"]));

    stage.on_model_loaded(index_of("fox"), result);

    assert_eq!(stage.scene().len(), 3);
}
