//! Finding elements in the scene graph by id and walking the hierarchy.

use std::collections::HashMap;

use bevy::prelude::*;

use super::components::{SceneGroup, SceneGroups};
use super::edits::element_id_of;

/// Direct children of an entity, in order
pub fn children_of(world: &World, entity: Entity) -> Vec<Entity> {
    world
        .get::<Children>(entity)
        .map(|children| children.to_vec())
        .unwrap_or_default()
}

/// The entity itself followed by all descendants, depth first
pub fn descendants(world: &World, entity: Entity) -> Vec<Entity> {
    let mut out = Vec::new();
    let mut stack = vec![entity];
    while let Some(current) = stack.pop() {
        out.push(current);
        let children = children_of(world, current);
        stack.extend(children.into_iter().rev());
    }
    out
}

/// Root entity of a top-level group
pub fn group_root(world: &World, group: SceneGroup) -> Option<Entity> {
    world
        .get_resource::<SceneGroups>()
        .map(|groups| groups.get(group))
        .filter(|root| world.get_entity(*root).is_ok())
}

/// Top-level group an entity lives under
pub fn group_of(world: &World, entity: Entity) -> Option<SceneGroup> {
    let mut current = entity;
    loop {
        if let Some(group) = world.get::<SceneGroup>(current) {
            return Some(*group);
        }
        current = world.get::<ChildOf>(current)?.parent();
    }
}

/// Depth-first search for an element with the given id in both groups
pub fn find_element(world: &World, id: &str) -> Option<Entity> {
    SceneGroup::ALL
        .iter()
        .filter_map(|group| group_root(world, *group))
        .flat_map(|root| descendants(world, root).into_iter().skip(1))
        .find(|entity| element_id_of(world, *entity) == id)
}

/// Snapshot of id -> entity for every element in the scene.
/// Entities without an `ElementId` are indexed under their engine id.
#[derive(Debug, Default)]
pub struct ElementIndex {
    by_id: HashMap<String, Entity>,
}

impl ElementIndex {
    pub fn build(world: &World) -> Self {
        let mut by_id = HashMap::new();
        for root in SceneGroup::ALL
            .iter()
            .filter_map(|group| group_root(world, *group))
        {
            for entity in descendants(world, root).into_iter().skip(1) {
                by_id.entry(element_id_of(world, entity)).or_insert(entity);
            }
        }
        Self { by_id }
    }

    pub fn get(&self, id: &str) -> Option<Entity> {
        self.by_id.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn insert(&mut self, id: String, entity: Entity) {
        self.by_id.insert(id, entity);
    }

    pub fn remove(&mut self, id: &str) -> Option<Entity> {
        self.by_id.remove(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::history::test_support::{building, external_model, spawn_record, test_world};

    #[test]
    fn test_index_covers_both_groups_and_nested_elements() {
        let mut world = test_world();
        spawn_record(&mut world, &building("b1", 10.0));
        spawn_record(&mut world, &external_model("x1"));
        let anonymous = world.spawn(Transform::default()).id();
        let buildings = world.resource::<SceneGroups>().buildings;
        world.entity_mut(anonymous).insert(ChildOf(buildings));

        let index = ElementIndex::build(&world);
        assert_eq!(index.len(), 3);
        assert!(index.contains("b1"));
        assert!(index.contains("x1"));
        assert_eq!(
            index.get(&element_id_of(&world, anonymous)),
            Some(anonymous)
        );
    }

    #[test]
    fn test_group_of_walks_to_the_root() {
        let mut world = test_world();
        let model = spawn_record(&mut world, &external_model("x1"));
        let part = world.spawn((Transform::default(), ChildOf(model))).id();

        assert_eq!(group_of(&world, part), Some(SceneGroup::ExternalModels));
        assert_eq!(find_element(&world, "x1"), Some(model));
        assert!(find_element(&world, "missing").is_none());
    }
}
