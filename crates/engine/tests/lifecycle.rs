mod common;

use common::{city, city_pixel, config, disc_color, drive, inputs, ready_map, ONE_CITY};
use engine::diagnostics::COUNTER_HOVER_RESTORED;
use engine::{HeadlessPlatform, HoverState, LifecycleState, MapHost, MapInstance};
use foundation::time::Millis;
use layers::MapKind;
use pretty_assertions::assert_eq;

#[test]
fn every_resource_is_freed_on_unmount() {
    let (mut map, mut platform, now) = ready_map(ONE_CITY);
    map.pointer_move(city_pixel(&map));
    drive(&mut map, &mut platform, now, now);
    assert!(!map.resource_counts().is_zero());

    map.unmount(&mut platform);
    assert_eq!(map.state(), LifecycleState::Disposed);
    assert!(map.resource_counts().is_zero());
    assert_eq!(map.scene().entity_count(), 0);
    assert!(map.tooltip().is_none());
    assert_eq!(platform.outstanding_frames(), 0);
    assert_eq!(platform.listener_count(), 0);
    assert_eq!(platform.stale_removals(), 0);
    assert_eq!(platform.surfaces().counts().live(), 0);
}

#[test]
fn unmount_while_building_cancels_the_build() {
    let mut platform = HeadlessPlatform::default();
    let mut map = MapInstance::new(MapKind::Domestic, config());
    map.mount(inputs(ONE_CITY), &mut platform, Millis(0.0))
        .expect("mount");
    assert_eq!(map.state(), LifecycleState::Building);

    map.unmount(&mut platform);
    drive(&mut map, &mut platform, 50.0, 1_000.0);
    assert_eq!(map.state(), LifecycleState::Disposed);
    assert!(map.resource_counts().is_zero());
    assert_eq!(map.next_timer(), None);
    assert_eq!(platform.frames_requested(), 0);
    assert_eq!(platform.listener_count(), 0);
    let surfaces = platform.surfaces().counts();
    assert_eq!((surfaces.created, surfaces.released), (1, 1));
}

#[test]
fn deactivation_stops_the_loop_and_restores_hover_once() {
    let (mut map, mut platform, now) = ready_map(ONE_CITY);
    let (key, marker) = city(&map);
    map.pointer_move(city_pixel(&map));
    let now = drive(&mut map, &mut platform, now, now);
    assert_eq!(map.hover_state(), HoverState::Hovering(key));
    assert_ne!(disc_color(&map), marker.original_color);

    map.set_active(false, &mut platform);
    map.set_active(false, &mut platform);
    assert_eq!(disc_color(&map), marker.original_color);
    assert_eq!(map.metrics().counter(COUNTER_HOVER_RESTORED), 1);
    assert!(map.tooltip().is_none());
    assert!(!map.is_running());
    assert_eq!(platform.outstanding_frames(), 0);

    let requested = platform.frames_requested();
    map.pointer_move(city_pixel(&map));
    let now = drive(&mut map, &mut platform, now, now + 500.0);
    assert_eq!(platform.frames_requested(), requested);
    assert_eq!(map.hover_state(), HoverState::Idle);

    let resources = map.resource_counts();
    map.set_active(true, &mut platform);
    drive(&mut map, &mut platform, now, now + 100.0);
    assert!(map.is_running());
    assert_eq!(map.resource_counts(), resources);
    assert_eq!(map.metrics().counter(COUNTER_HOVER_RESTORED), 1);
}

#[test]
fn diagnostics_report_the_live_scene() {
    let mut platform = HeadlessPlatform::new(1.5);
    let mut cfg = config();
    cfg.diagnostics = true;
    let mut map = MapInstance::new(MapKind::Domestic, cfg);
    map.mount(inputs(ONE_CITY), &mut platform, Millis(0.0))
        .expect("mount");
    drive(&mut map, &mut platform, 0.0, 1_000.0);

    let snapshot = map.diagnostics().expect("diagnostics enabled");
    assert_eq!(snapshot.interactive_entities, 2);
    assert_eq!(snapshot.max_pixel_ratio, 1.5);
    assert_eq!(snapshot.pixel_ratio, 1.5);
    assert!(snapshot.draw_calls > 0);
    assert!(snapshot.fps > 0.0);
}

#[test]
fn governor_ceiling_follows_the_device_capped_by_config() {
    let mut platform = HeadlessPlatform::new(3.0);
    let mut cfg = config();
    cfg.diagnostics = true;
    let mut map = MapInstance::new(MapKind::Domestic, cfg);
    map.mount(inputs(ONE_CITY), &mut platform, Millis(0.0))
        .expect("mount");
    drive(&mut map, &mut platform, 0.0, 400.0);
    let snapshot = map.diagnostics().expect("diagnostics enabled");
    assert_eq!(snapshot.max_pixel_ratio, 2.0);
    assert_eq!(snapshot.pixel_ratio, 2.0);
}

#[test]
fn switching_kinds_mid_build_keeps_a_single_loop() {
    let mut host = MapHost::new(HeadlessPlatform::default(), config());
    let mut world = inputs(ONE_CITY);
    world.kind = MapKind::World;
    host.mount_both(inputs(ONE_CITY), world, Millis(0.0))
        .expect("mount");

    host.switch_to(MapKind::World);
    assert_eq!(host.platform().outstanding_frames(), 0);
    let mut now = 0.0;
    while now < 2_000.0 {
        host.pump(Millis(now));
        assert!(host.platform().outstanding_frames() <= 1);
        if now == 480.0 {
            host.switch_to(MapKind::Domestic);
        }
        if now == 960.0 {
            host.switch_to(MapKind::World);
        }
        now += 16.0;
    }
    assert_eq!(host.platform().max_outstanding_frames(), 1);
    assert!(host.instance(MapKind::World).is_running());
    assert!(!host.instance(MapKind::Domestic).is_running());

    host.unmount_all();
    assert!(host.instance(MapKind::Domestic).resource_counts().is_zero());
    assert!(host.instance(MapKind::World).resource_counts().is_zero());
    assert_eq!(host.platform().listener_count(), 0);
}
