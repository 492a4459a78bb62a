//! # Entity Hierarchies — Parent/Child Relationships
//!
//! A hierarchy is two ordinary components kept in step:
//!
//! ```text
//!   A: Children([B, C])
//!   B: Parent(A)
//!   C: Parent(A), Children([D])
//!   D: Parent(C)
//! ```
//!
//! The child list on the parent is ordered and holds each child once. The
//! [`Parent`] back-reference on the child does not own the parent; destroying
//! a parent orphans its children instead of destroying them (use
//! [`Commands::destroy_recursive`](super::commands::Commands::destroy_recursive)
//! for that).
//!
//! Neither component can be inserted, removed or mutated through the generic
//! [`Commands`] component API; a one-sided edit would leave the other side
//! dangling. Edits are recorded through a [`HierarchyEditor`] and applied when the
//! owning [`Commands`] executes:
//!
//! ```ignore
//! let mut commands = Commands::new(&mut world);
//! let root = commands.spawn_empty();
//! let leaf = commands.spawn_immediate((Name("leaf"),))?;
//! commands.change_hierarchy(root)?.append([leaf])?;
//! commands.execute()?;
//! ```

use std::any::TypeId;

use super::commands::{Command, Commands};
use super::entity::Entity;
use super::storage::Storage;
use crate::error::EcsError;

/// Marks an entity as a child of another entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent(Entity);

impl Parent {
    pub fn get(&self) -> Entity {
        self.0
    }
}

/// Ordered list of an entity's children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Children(Vec<Entity>);

impl Children {
    pub fn as_slice(&self) -> &[Entity] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.0.contains(&entity)
    }
}

/// Fails with [`EcsError::HierarchyManaged`] for [`Parent`] and [`Children`].
pub(crate) fn ensure_not_hierarchy(type_id: TypeId, component: &'static str) -> Result<(), EcsError> {
    if type_id == TypeId::of::<Parent>() || type_id == TypeId::of::<Children>() {
        Err(EcsError::HierarchyManaged { component })
    } else {
        Ok(())
    }
}

/// Records hierarchy edits for one parent into a [`Commands`] buffer.
///
/// Returned by [`Commands::change_hierarchy`]. Nothing is applied until the
/// commands execute; each edit then sees the effect of the ones recorded
/// before it.
pub struct HierarchyEditor<'c, 'w> {
    commands: &'c mut Commands<'w>,
    parent: Entity,
}

impl<'c, 'w> HierarchyEditor<'c, 'w> {
    pub(crate) fn new(commands: &'c mut Commands<'w>, parent: Entity) -> Self {
        Self { commands, parent }
    }

    /// The entity whose children this editor changes.
    pub fn parent(&self) -> Entity {
        self.parent
    }

    /// Append `children` to the end of the parent's child list.
    ///
    /// Children must be alive when the edit is recorded.
    pub fn append(
        &mut self,
        children: impl IntoIterator<Item = Entity>,
    ) -> Result<&mut Self, EcsError> {
        let children: Vec<Entity> = children.into_iter().collect();
        for &child in &children {
            self.commands.storage().ensure_alive(child)?;
        }
        self.commands.push(Command::AppendChildren {
            parent: self.parent,
            children,
        });
        Ok(self)
    }

    /// Remove `child`, which must sit at `index` in the parent's child list
    /// once the edits recorded before this one have been applied.
    pub fn remove(&mut self, child: Entity, index: usize) -> Result<&mut Self, EcsError> {
        self.commands.storage().ensure_alive(child)?;
        self.commands.push(Command::RemoveChild {
            parent: self.parent,
            child,
            index,
        });
        Ok(self)
    }
}

// ── Storage-level edits ──────────────────────────────────────────────────

impl Storage {
    /// Parent of `entity`, if it has one.
    pub fn parent_of(&self, entity: Entity) -> Option<Entity> {
        self.store::<Parent>()?.get(entity).map(Parent::get)
    }

    /// Children of `entity`, in order. Empty for leaves and dead entities.
    pub fn children_of(&self, entity: Entity) -> &[Entity] {
        self.store::<Children>()
            .and_then(|store| store.get(entity))
            .map(Children::as_slice)
            .unwrap_or(&[])
    }

    /// Whether `ancestor` appears on the parent chain above `entity`.
    pub fn is_ancestor(&self, ancestor: Entity, entity: Entity) -> bool {
        let mut current = self.parent_of(entity);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent_of(parent);
        }
        false
    }

    /// Append children to `parent`, moving any that currently sit under a
    /// different parent. Children already under `parent` keep their place.
    ///
    /// Every child is validated before anything changes.
    pub(crate) fn append_children(
        &mut self,
        parent: Entity,
        children: &[Entity],
    ) -> Result<(), EcsError> {
        self.ensure_alive(parent)?;
        for &child in children {
            self.ensure_alive(child)?;
            if child == parent || self.is_ancestor(child, parent) {
                return Err(EcsError::HierarchyCycle { parent, child });
            }
        }

        for &child in children {
            match self.parent_of(child) {
                Some(current) if current == parent => continue,
                Some(_) => self.unlink_from_parent(child)?,
                None => {}
            }
            self.insert(child, Parent(parent))?;
            match self.get_mut::<Children>(parent) {
                Ok(list) => list.0.push(child),
                Err(_) => self.insert(parent, Children(vec![child]))?,
            }
            log::trace!("{child} is now a child of {parent}");
        }
        Ok(())
    }

    /// Remove the child at `index` of `parent`'s list, checking it is `child`.
    pub(crate) fn remove_child(
        &mut self,
        parent: Entity,
        child: Entity,
        index: usize,
    ) -> Result<(), EcsError> {
        self.ensure_alive(parent)?;
        self.ensure_alive(child)?;
        if self.children_of(parent).get(index) != Some(&child) {
            return Err(EcsError::ChildNotAtIndex {
                parent,
                child,
                index,
            });
        }

        let now_empty = {
            let list = self.get_mut::<Children>(parent)?;
            list.0.remove(index);
            list.0.is_empty()
        };
        if now_empty {
            self.remove::<Children>(parent)?;
        }
        self.remove::<Parent>(child)?;
        log::trace!("{child} removed from {parent}");
        Ok(())
    }

    /// Detach `entity` from its parent, if any.
    fn unlink_from_parent(&mut self, entity: Entity) -> Result<(), EcsError> {
        let Some(parent) = self.parent_of(entity) else {
            return Ok(());
        };
        self.remove::<Parent>(entity)?;
        if !self.is_alive(parent) {
            return Ok(());
        }
        let now_empty = match self.get_mut::<Children>(parent) {
            Ok(list) => {
                list.0.retain(|&c| c != entity);
                list.0.is_empty()
            }
            Err(_) => false,
        };
        if now_empty {
            self.remove::<Children>(parent)?;
        }
        Ok(())
    }

    /// Destroy `entity`, unlinking it from its parent and orphaning its
    /// children.
    pub(crate) fn destroy(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.ensure_alive(entity)?;
        self.unlink_from_parent(entity)?;
        let children = self.children_of(entity).to_vec();
        for child in children {
            if self.is_alive(child) {
                self.remove::<Parent>(child)?;
            }
        }
        self.despawn(entity)
    }

    /// Destroy `entity` and every descendant. Returns how many entities were
    /// destroyed.
    ///
    /// Nothing is unlinked or freed unless every entity in the subtree is
    /// alive.
    pub(crate) fn destroy_recursive(&mut self, entity: Entity) -> Result<usize, EcsError> {
        self.ensure_alive(entity)?;

        // Breadth-first so the list is complete before anything is freed.
        let mut subtree = vec![entity];
        let mut i = 0;
        while i < subtree.len() {
            let current = subtree[i];
            self.ensure_alive(current)?;
            subtree.extend_from_slice(self.children_of(current));
            i += 1;
        }

        self.unlink_from_parent(entity)?;
        for &e in &subtree {
            self.despawn(e)?;
        }
        Ok(subtree.len())
    }
}
