mod common;

use common::{city, city_pixel, drive, ready_map, ONE_CITY};
use engine::{Cursor, HeadlessPlatform, HoverState, MapInstance};
use foundation::math::{LonLat, MercatorProjector, ProjectionParams, Vec2};
use foundation::time::Millis;
use layers::MapKind;
use pretty_assertions::assert_eq;
use scene::map_entity::{EntityKind, MapEntity};

const CITY_WITH_LINKS: &str = r#"[{"name": "Fujian", "cities": [{
    "name": "Ningde",
    "coordinates": [119.5, 26.6],
    "districts": [{"name": "Jiaocheng", "url": "https://example.com/jiaocheng"}]
}]}]"#;

#[test]
fn projection_is_bit_identical_across_calls() {
    let params = ProjectionParams::new(LonLat::new(119.5, 26.5), 100.0);
    let a = MercatorProjector::new(params).project(LonLat::new(119.5, 26.6));
    let b = MercatorProjector::new(params).project(LonLat::new(119.5, 26.6));
    assert_eq!(a.map(|p| (p.x.to_bits(), p.y.to_bits())), b.map(|p| (p.x.to_bits(), p.y.to_bits())));
    assert!(MercatorProjector::new(params).project(LonLat::new(0.0, 90.0)).is_none());
}

#[test]
fn quad_with_one_city_builds_one_of_each_and_picks_the_city() {
    let (mut map, mut platform, now) = ready_map(ONE_CITY);
    let kinds: Vec<EntityKind> = map.scene().entities().map(|(_, e)| e.kind()).collect();
    assert_eq!(kinds, vec![EntityKind::Region, EntityKind::City]);

    let (key, _) = city(&map);
    map.pointer_move(city_pixel(&map));
    drive(&mut map, &mut platform, now, now);
    assert_eq!(map.hover_state(), HoverState::Hovering(key));
    let tooltip = map.tooltip().expect("tooltip");
    assert_eq!(tooltip.kind, EntityKind::City);
    assert_eq!(tooltip.label, "Ningde");
}

#[test]
fn city_without_links_is_not_an_interactive_kind() {
    let (mut map, mut platform, now) = ready_map(ONE_CITY);
    map.pointer_move(city_pixel(&map));
    drive(&mut map, &mut platform, now, now);
    let tooltip = map.tooltip().expect("tooltip");
    assert!(tooltip.links.is_empty());
    assert!(!tooltip.is_interactive_kind);
    assert_eq!(map.cursor(), Cursor::Default);
}

#[test]
fn city_with_districts_carries_its_links() {
    let (mut map, mut platform, now) = ready_map(CITY_WITH_LINKS);
    map.pointer_move(city_pixel(&map));
    drive(&mut map, &mut platform, now, now);
    let tooltip = map.tooltip().expect("tooltip");
    assert_eq!(tooltip.links.len(), 1);
    assert_eq!(tooltip.links[0].name, "Jiaocheng");
    assert!(tooltip.is_interactive_kind);
    assert_eq!(map.cursor(), Cursor::Pointer);
}

#[test]
fn same_target_twice_does_not_move_the_tooltip() {
    let (mut map, mut platform, now) = ready_map(ONE_CITY);
    let px = city_pixel(&map);
    map.pointer_move(px);
    let now = drive(&mut map, &mut platform, now, now);
    let first = map.tooltip().expect("tooltip").position;

    map.pointer_move(Vec2::new(px.x + 1.0, px.y + 1.0));
    drive(&mut map, &mut platform, now, now + 100.0);
    assert_eq!(map.tooltip().expect("tooltip").position, first);
}

#[test]
fn tooltip_survives_the_trip_into_the_panel() {
    let (mut map, mut platform, now) = ready_map(ONE_CITY);
    map.pointer_move(city_pixel(&map));
    let now = drive(&mut map, &mut platform, now, now);

    map.pointer_leave(Millis(now));
    assert!(matches!(map.hover_state(), HoverState::GracePeriod { .. }));
    map.tooltip_enter();
    let now = drive(&mut map, &mut platform, now, now + 1_000.0);
    assert!(map.tooltip().expect("held").pinned);

    map.tooltip_leave();
    assert!(map.tooltip().is_none());
    drive(&mut map, &mut platform, now, now + 100.0);
    assert_eq!(map.hover_state(), HoverState::Idle);
}

#[test]
fn tooltip_hides_once_the_grace_window_elapses() {
    let (mut map, mut platform, now) = ready_map(ONE_CITY);
    map.pointer_move(city_pixel(&map));
    let now = drive(&mut map, &mut platform, now, now);

    map.pointer_leave(Millis(now));
    let now = drive(&mut map, &mut platform, now, now + 200.0);
    assert!(map.tooltip().is_some());
    drive(&mut map, &mut platform, now, now + 200.0);
    assert!(map.tooltip().is_none());
    assert_eq!(map.hover_state(), HoverState::Idle);
}

#[test]
fn capital_star_is_never_picked() {
    let mut platform = HeadlessPlatform::default();
    let mut map = MapInstance::new(MapKind::Domestic, common::config());
    let mut inputs = common::inputs(ONE_CITY);
    inputs.capital = Some(LonLat::new(118.6, 27.4));
    map.mount(inputs, &mut platform, Millis(0.0)).expect("mount");
    let now = drive(&mut map, &mut platform, 0.0, 1_400.0);

    let (region, star) = map
        .scene()
        .entities()
        .fold((None, None), |(region, star), (key, entity)| match entity {
            MapEntity::Region(_) => (Some(key), star),
            MapEntity::Capital(capital) => (region, Some(capital.position)),
            _ => (region, star),
        });
    let px = map
        .screen_position(star.expect("capital star"))
        .expect("star on screen");
    map.pointer_move(px);
    drive(&mut map, &mut platform, now, now);
    assert_eq!(map.hover_state(), HoverState::Hovering(region.expect("region")));
    assert_eq!(map.tooltip().expect("tooltip").kind, EntityKind::Region);
}
