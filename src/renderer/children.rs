//! Children reconciliation and the keyed diff.

use std::collections::HashMap;

use tracing::warn;

use crate::component::Scope;
use crate::error::Result;
use crate::renderer::lis::longest_increasing_subsequence;
use crate::renderer::{Platform, Renderer};
use crate::types::{ElementHandle, Key};
use crate::vnode::{Children, VNode, is_same_vnode_type};

impl<P: Platform + 'static> Renderer<P> {
    /// Reconcile `n1`'s children into `n2`'s inside `container`. `anchor` is
    /// where appended children go (a fragment's end marker, else `None`).
    pub(super) fn patch_children(
        &self,
        n1: &VNode,
        n2: &VNode,
        container: ElementHandle,
        anchor: Option<ElementHandle>,
        scope: Scope<'_>,
    ) -> Result<()> {
        let host = self.host();
        match (n1.children(), n2.children()) {
            (Children::Array(old), Children::Text(text)) => {
                self.unmount_children(old);
                host.set_element_text(container, text);
            }
            (Children::Text(old), Children::Text(text)) => {
                if old != text {
                    host.set_element_text(container, text);
                }
            }
            (_, Children::Text(text)) => host.set_element_text(container, text),

            (Children::Array(old), Children::Array(new)) => {
                self.patch_keyed_children(old, new, container, anchor, scope)?;
            }
            (Children::Text(_), Children::Array(new)) => {
                host.set_element_text(container, "");
                self.mount_children(new, container, anchor, scope)?;
            }
            (_, Children::Array(new)) => self.mount_children(new, container, anchor, scope)?,

            (Children::Array(old), Children::None | Children::Slots(_)) => self.unmount_children(old),
            (Children::Text(_), Children::None | Children::Slots(_)) => {
                host.set_element_text(container, "");
            }
            (_, Children::None | Children::Slots(_)) => {}
        }
        Ok(())
    }

    /// Keyed diff of two sibling lists.
    ///
    /// 1. patch the common prefix
    /// 2. patch the common suffix
    /// 3. only new nodes left: mount them
    /// 4. only old nodes left: unmount them
    /// 5. otherwise match the middle by key (or by type for unkeyed nodes),
    ///    unmount the unmatched, mount the new, and move only the nodes that
    ///    are not on the longest increasing run of old positions
    pub(super) fn patch_keyed_children(
        &self,
        c1: &[VNode],
        c2: &[VNode],
        container: ElementHandle,
        parent_anchor: Option<ElementHandle>,
        scope: Scope<'_>,
    ) -> Result<()> {
        let mut i = 0usize;
        // exclusive ends: the unmatched ranges are c1[i..end1] and c2[i..end2]
        let mut end1 = c1.len();
        let mut end2 = c2.len();

        // 1. prefix
        while i < end1 && i < end2 && is_same_vnode_type(&c1[i], &c2[i]) {
            self.patch(Some(&c1[i]), &c2[i], container, None, scope)?;
            i += 1;
        }

        // 2. suffix
        while i < end1 && i < end2 && is_same_vnode_type(&c1[end1 - 1], &c2[end2 - 1]) {
            self.patch(Some(&c1[end1 - 1]), &c2[end2 - 1], container, None, scope)?;
            end1 -= 1;
            end2 -= 1;
        }

        if i >= end1 {
            // 3. mount the rest of the new list before the matched tail
            if i < end2 {
                let anchor = c2.get(end2).map_or(parent_anchor, VNode::el);
                for vnode in &c2[i..end2] {
                    self.patch(None, vnode, container, anchor, scope)?;
                }
            }
            return Ok(());
        }

        if i >= end2 {
            // 4. drop the rest of the old list
            for vnode in &c1[i..end1] {
                self.unmount(vnode, true);
            }
            return Ok(());
        }

        // 5. unknown middle
        let start = i;
        let to_be_patched = end2 - start;

        let key_to_new_index: HashMap<&Key, usize> = (start..end2)
            .filter_map(|j| c2[j].key().map(|key| (key, j)))
            .collect();

        // new offset → old index + 1 (0 = no match, mount fresh)
        let mut new_index_to_old_index = vec![0usize; to_be_patched];
        let mut patched = 0usize;
        let mut moved = false;
        let mut max_new_index_so_far = 0usize;

        for (old_index, prev) in c1.iter().enumerate().take(end1).skip(start) {
            if patched >= to_be_patched {
                // every new node is matched; the rest are leftovers
                self.unmount(prev, true);
                continue;
            }

            let new_index = match prev.key() {
                Some(key) => key_to_new_index.get(key).copied(),
                None => (start..end2).find(|&j| {
                    new_index_to_old_index[j - start] == 0
                        && c2[j].key().is_none()
                        && is_same_vnode_type(prev, &c2[j])
                }),
            };

            match new_index {
                None => self.unmount(prev, true),
                Some(j) if new_index_to_old_index[j - start] != 0 => {
                    warn!(key = ?prev.key(), "duplicate key in children list");
                    self.unmount(prev, true);
                }
                Some(j) => {
                    new_index_to_old_index[j - start] = old_index + 1;
                    if j >= max_new_index_so_far {
                        max_new_index_so_far = j;
                    } else {
                        moved = true;
                    }
                    self.patch(Some(prev), &c2[j], container, None, scope)?;
                    patched += 1;
                }
            }
        }

        let stable = if moved {
            longest_increasing_subsequence(&new_index_to_old_index)
        } else {
            Vec::new()
        };
        let mut stable = stable.iter().rev().peekable();

        // walk backwards so the following sibling is always in place
        for offset in (0..to_be_patched).rev() {
            let index = start + offset;
            let vnode = &c2[index];
            let anchor = c2.get(index + 1).map_or(parent_anchor, VNode::el);

            if new_index_to_old_index[offset] == 0 {
                self.patch(None, vnode, container, anchor, scope)?;
            } else if moved {
                if stable.peek() == Some(&&offset) {
                    stable.next();
                } else {
                    self.move_vnode(vnode, container, anchor);
                }
            }
        }
        Ok(())
    }
}
