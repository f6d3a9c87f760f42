//! Cursor-based navigation over the table's B-tree.
//!
//! A cursor is an ephemeral position `(page, cell)` inside a leaf. It is the
//! only way to iterate rows in key order: advancing walks the cells of one
//! leaf and then follows the sibling pointer to the next.

use super::btree::NodeType;
use super::row::Row;
use super::table::Table;
use crate::errors::Error;

/// A position within the table.
///
/// # Lifetime
/// The cursor borrows the table mutably for its entire lifetime; it never
/// outlives the operation that created it.
pub struct Cursor<'a> {
    pub table: &'a mut Table,
    pub page_num: u32,
    pub cell_num: u32,
    /// Indicates a position one past the last element.
    pub end_of_table: bool,
}

impl<'a> Cursor<'a> {
    /// Positions a cursor at `key`, or at the slot where `key` would be
    /// inserted to preserve leaf order.
    ///
    /// Descends from the root through internal nodes by separator search and
    /// finishes with a binary search inside the leaf.
    pub fn find(table: &'a mut Table, key: u32) -> Result<Self, Error> {
        let mut page_num = table.root_page_num;

        let cell_num = loop {
            table.pager.ensure(page_num)?;
            let node = table.pager.get(page_num)?;
            match node.node_type()? {
                NodeType::Leaf => break node.find_leaf_cell(key)?,
                NodeType::Internal => {
                    let child_index = node.find_child(key)?;
                    let child_page_num = node.internal_child(child_index)?;
                    drop(node);
                    page_num = child_page_num;
                }
            }
        };

        Ok(Cursor {
            table,
            page_num,
            cell_num,
            end_of_table: false,
        })
    }

    /// Positions a cursor at the smallest key in the table.
    ///
    /// The table is empty exactly when the leaf holding key 0 has no cells.
    pub fn start(table: &'a mut Table) -> Result<Self, Error> {
        let mut cursor = Cursor::find(table, 0)?;
        let num_cells = cursor.table.pager.get(cursor.page_num)?.leaf_num_cells();
        cursor.end_of_table = num_cells == 0;
        Ok(cursor)
    }

    /// Deserializes the row under the cursor.
    pub fn read_row(&self) -> Result<Row, Error> {
        let node = self.table.pager.get(self.page_num)?;
        Row::deserialize(node.leaf_value(self.cell_num)?)
    }

    /// Advances to the next cell, hopping to the sibling leaf when the
    /// current one is exhausted. `next_leaf == 0` marks the rightmost leaf.
    pub fn advance(&mut self) -> Result<(), Error> {
        let (num_cells, next_leaf) = {
            let node = self.table.pager.get(self.page_num)?;
            (node.leaf_num_cells(), node.leaf_next_leaf())
        };

        self.cell_num += 1;
        if self.cell_num >= num_cells {
            if next_leaf == 0 {
                self.end_of_table = true;
            } else {
                self.table.pager.ensure(next_leaf)?;
                self.page_num = next_leaf;
                self.cell_num = 0;
            }
        }
        Ok(())
    }
}
