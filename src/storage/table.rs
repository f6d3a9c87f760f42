//! Table lifecycle and B-tree mutation.
//!
//! A table owns its pager and the root page number, which is always page 0:
//! splitting the root copies its contents to a fresh page and re-initializes
//! page 0 as the new internal root, so the root never moves.
//!
//! Why is a tree a good structure for a table? Searching for a key is
//! logarithmic, inserting near a found position is cheap, and a range walk
//! along the leaf chain is sequential — none of which an unsorted row array
//! offers once the file outgrows memory.
use super::btree::{
    Node, NodeType, INTERNAL_NODE_MAX_CELLS, LEAF_NODE_LEFT_SPLIT_COUNT, LEAF_NODE_MAX_CELLS,
    LEAF_NODE_RIGHT_SPLIT_COUNT,
};
use super::cursor::Cursor;
use super::pager::Pager;
use super::row::Row;
use crate::errors::Error;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Handle to the single table stored in a database file.
pub struct Table {
    pub path: PathBuf,
    pub root_page_num: u32,
    pub pager: Pager,
}

impl Table {
    /// Opens the database file, initializing page 0 as an empty root leaf
    /// when the file is new.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let mut pager = Pager::open(path)?;

        if pager.num_pages() == 0 {
            pager.ensure(0)?;
            let mut root = pager.get(0)?;
            root.init_leaf();
            root.set_root(true);
        }

        info!(path = %path.display(), num_pages = pager.num_pages(), "Opened table");
        Ok(Table {
            path: path.to_path_buf(),
            root_page_num: 0,
            pager,
        })
    }

    /// Flushes every resident page and releases the file.
    pub fn close(&mut self) -> Result<(), Error> {
        self.pager.close()?;
        info!(path = %self.path.display(), "Closed table");
        Ok(())
    }
}

/// Inserts a row keyed by its id.
///
/// # Errors
/// - `Error::DuplicateKey` when the id is already present.
/// - `Error::Storage` when the insert would require splitting an internal
///   node, which is not implemented.
pub fn insert_row(table: &mut Table, row: &Row) -> Result<(), Error> {
    let key = row.id;
    debug!(key, "Inserting row");

    let mut cursor = Cursor::find(table, key)?;

    let needs_split = {
        let mut node = cursor.table.pager.get(cursor.page_num)?;
        let num_cells = node.leaf_num_cells();

        if cursor.cell_num < num_cells && node.leaf_key(cursor.cell_num)? == key {
            return Err(Error::DuplicateKey);
        }

        if (num_cells as usize) < LEAF_NODE_MAX_CELLS {
            // shift cells right of the insertion slot to make room
            for i in (cursor.cell_num + 1..=num_cells).rev() {
                let prev = node.leaf_cell(i - 1)?.to_vec();
                node.leaf_cell_mut(i)?.copy_from_slice(&prev);
            }
            node.set_leaf_key(cursor.cell_num, key)?;
            row.serialize(node.leaf_value_mut(cursor.cell_num)?)?;
            node.set_leaf_num_cells(num_cells + 1);
            false
        } else {
            true
        }
    };

    if needs_split {
        warn!(page_num = cursor.page_num, "Leaf node full, splitting");
        leaf_node_split_and_insert(&mut cursor, key, row)?;
    }
    Ok(())
}

/// Creates a sibling leaf and redistributes the thirteen existing cells plus
/// the incoming one evenly across both, then wires the parent.
fn leaf_node_split_and_insert(cursor: &mut Cursor, key: u32, row: &Row) -> Result<(), Error> {
    let new_page_num = cursor.table.pager.unused_page_num();
    cursor.table.pager.ensure(new_page_num)?;
    debug!(old_page = cursor.page_num, new_page = new_page_num, "Splitting leaf node");

    let (was_root, parent_page_num, old_max) = {
        let mut old_node = cursor.table.pager.get(cursor.page_num)?;
        let mut new_node = cursor.table.pager.get(new_page_num)?;

        let old_max = old_node.max_key()?;

        new_node.init_leaf();
        new_node.set_parent(old_node.parent());

        // The old leaf's sibling becomes the new leaf, and the new leaf
        // takes over whatever used to be the old leaf's sibling.
        new_node.set_leaf_next_leaf(old_node.leaf_next_leaf());
        old_node.set_leaf_next_leaf(new_page_num);

        // All existing keys plus the new key are divided evenly between the
        // old (left) and new (right) nodes, filling from the right.
        let old = (*old_node).clone();
        for i in (0..=LEAF_NODE_MAX_CELLS).rev() {
            let dest_node: &mut Node = if i >= LEAF_NODE_LEFT_SPLIT_COUNT {
                &mut new_node
            } else {
                &mut old_node
            };
            let cell_num = (i % LEAF_NODE_LEFT_SPLIT_COUNT) as u32;

            if i == cursor.cell_num as usize {
                dest_node.set_leaf_key(cell_num, key)?;
                row.serialize(dest_node.leaf_value_mut(cell_num)?)?;
            } else if i > cursor.cell_num as usize {
                let cell = old.leaf_cell(i as u32 - 1)?.to_vec();
                dest_node.leaf_cell_mut(cell_num)?.copy_from_slice(&cell);
            } else {
                let cell = old.leaf_cell(i as u32)?.to_vec();
                dest_node.leaf_cell_mut(cell_num)?.copy_from_slice(&cell);
            }
        }

        old_node.set_leaf_num_cells(LEAF_NODE_LEFT_SPLIT_COUNT as u32);
        new_node.set_leaf_num_cells(LEAF_NODE_RIGHT_SPLIT_COUNT as u32);

        (old_node.is_root(), old_node.parent(), old_max)
    };

    if was_root {
        return create_new_root(cursor.table, new_page_num);
    }

    // The old leaf kept the lower half, so its separator in the parent
    // shrank from old_max to its new max; then the new leaf is registered.
    let new_max = cursor.table.pager.get(cursor.page_num)?.max_key()?;
    cursor.table.pager.ensure(parent_page_num)?;
    {
        let mut parent = cursor.table.pager.get(parent_page_num)?;
        parent.update_key(old_max, new_max)?;
    }
    internal_node_insert(cursor.table, parent_page_num, new_page_num)
}

/// Splits the root: its contents move wholesale to a fresh left child so
/// page 0 can be re-initialized as the new internal root over both halves.
fn create_new_root(table: &mut Table, right_child_page_num: u32) -> Result<(), Error> {
    let left_child_page_num = table.pager.unused_page_num();
    debug!(
        left_child_page_num,
        right_child_page_num, "Creating new root"
    );
    table.pager.ensure(left_child_page_num)?;
    table.pager.ensure(right_child_page_num)?;

    let mut root = table.pager.get(table.root_page_num)?;
    let mut right_child = table.pager.get(right_child_page_num)?;
    let mut left_child = table.pager.get(left_child_page_num)?;

    left_child.data.copy_from_slice(&root.data);
    left_child.set_root(false);

    root.init_internal();
    root.set_root(true);
    root.set_internal_num_keys(1);
    root.set_internal_child(0, left_child_page_num)?;
    let left_child_max_key = left_child.max_key()?;
    root.set_internal_key(0, left_child_max_key)?;
    root.set_internal_right_child(right_child_page_num);

    left_child.set_parent(table.root_page_num);
    right_child.set_parent(table.root_page_num);
    Ok(())
}

/// Adds a new child/key pair to `parent`.
///
/// The rightmost child pointer is stored apart from the cells, so a child
/// whose max key exceeds the current right child's becomes the new right
/// child and the old one moves into a regular cell; otherwise cells shift
/// right to open the slot chosen by separator search.
fn internal_node_insert(
    table: &mut Table,
    parent_page_num: u32,
    child_page_num: u32,
) -> Result<(), Error> {
    debug!(parent_page_num, child_page_num, "Inserting child into parent");
    table.pager.ensure(parent_page_num)?;
    table.pager.ensure(child_page_num)?;

    let child_max_key = table.pager.get(child_page_num)?.max_key()?;
    let right_child_page_num = {
        let parent = table.pager.get(parent_page_num)?;
        if parent.internal_num_keys() as usize >= INTERNAL_NODE_MAX_CELLS {
            return Err(err!(Storage, "need to implement splitting internal node"));
        }
        parent.internal_right_child()
    };

    table.pager.ensure(right_child_page_num)?;
    let right_child_max_key = table.pager.get(right_child_page_num)?.max_key()?;

    let mut parent = table.pager.get(parent_page_num)?;
    let index = parent.find_child(child_max_key)?;
    let original_num_keys = parent.internal_num_keys();
    parent.set_internal_num_keys(original_num_keys + 1);

    if child_max_key > right_child_max_key {
        parent.set_internal_child(original_num_keys, right_child_page_num)?;
        parent.set_internal_key(original_num_keys, right_child_max_key)?;
        parent.set_internal_right_child(child_page_num);
    } else {
        for i in (index + 1..=original_num_keys).rev() {
            let cell = parent.internal_cell(i - 1)?;
            parent.set_internal_cell(i, &cell)?;
        }
        parent.set_internal_child(index, child_page_num)?;
        parent.set_internal_key(index, child_max_key)?;
    }
    Ok(())
}

/// Walks the leaf chain from the smallest key, yielding rows in key order.
pub fn select_rows(table: &mut Table) -> Result<Vec<Row>, Error> {
    let mut rows = Vec::new();
    let mut cursor = Cursor::start(table)?;
    while !cursor.end_of_table {
        rows.push(cursor.read_row()?);
        cursor.advance()?;
    }
    Ok(rows)
}

/// Renders the tree depth-first for the `.btree` meta-command.
pub fn render_tree(table: &mut Table) -> Result<String, Error> {
    let mut out = String::new();
    render_node(table, table.root_page_num, 0, &mut out)?;
    Ok(out)
}

fn render_node(
    table: &mut Table,
    page_num: u32,
    level: usize,
    out: &mut String,
) -> Result<(), Error> {
    table.pager.ensure(page_num)?;
    let node_type = table.pager.get(page_num)?.node_type()?;

    match node_type {
        NodeType::Leaf => {
            let node = table.pager.get(page_num)?;
            let num_cells = node.leaf_num_cells();
            out.push_str(&format!("{}- leaf (size {})\n", indent(level), num_cells));
            for i in 0..num_cells {
                out.push_str(&format!("{}- {}\n", indent(level + 1), node.leaf_key(i)?));
            }
        }
        NodeType::Internal => {
            let (num_keys, cells, right_child) = {
                let node = table.pager.get(page_num)?;
                let num_keys = node.internal_num_keys();
                let mut cells = Vec::with_capacity(num_keys as usize);
                for i in 0..num_keys {
                    cells.push((node.internal_child(i)?, node.internal_key(i)?));
                }
                (num_keys, cells, node.internal_right_child())
            };
            out.push_str(&format!("{}- internal (size {})\n", indent(level), num_keys));
            for (child, key) in cells {
                render_node(table, child, level + 1, out)?;
                out.push_str(&format!("{}- key {}\n", indent(level + 1), key));
            }
            render_node(table, right_child, level + 1, out)?;
        }
    }
    Ok(())
}

fn indent(level: usize) -> String {
    " ".repeat(level)
}
