//! B-tree node layout and typed page views.
//!
//! Every 4,096-byte page is exactly one node, and the on-disk format IS the
//! in-memory format: a [`Node`] owns the raw page buffer and exposes typed
//! readers/writers over fixed little-endian offsets. No per-node objects are
//! materialized beyond this view.
//!
//! Two node shapes share a common header:
//!
//! | **Property**       | **Internal Node**             | **Leaf Node**       |
//! |--------------------|-------------------------------|---------------------|
//! | Stores             | keys and pointers to children | keys and values     |
//! | Number of pointers | number of keys + 1            | one sibling pointer |
//! | Stores values?     | No                            | Yes                 |
//!
//! A leaf keeps its cells sorted by key and threads a `next_leaf` pointer to
//! its right sibling, so a full scan is a walk along the leaf chain. Page 0
//! is always the root, which lets `next_leaf == 0` mean "no sibling".
use super::pager::PAGE_SIZE;
use super::row::ROW_SIZE;
use crate::errors::Error;

/// Discriminates the two page shapes; stored as the first header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// A routing node holding child page numbers and separator keys.
    Internal,
    /// A leaf node containing key-value cells and a sibling pointer.
    Leaf,
}

// Common node header layout

const NODE_TYPE_SIZE: usize = std::mem::size_of::<u8>();
const NODE_TYPE_OFFSET: usize = 0;
const IS_ROOT_SIZE: usize = std::mem::size_of::<u8>();
const IS_ROOT_OFFSET: usize = NODE_TYPE_OFFSET + NODE_TYPE_SIZE;
const PARENT_POINTER_SIZE: usize = std::mem::size_of::<u32>();
const PARENT_POINTER_OFFSET: usize = IS_ROOT_OFFSET + IS_ROOT_SIZE;

/// Total size of the common node header (6 bytes).
pub const COMMON_NODE_HEADER_SIZE: usize = NODE_TYPE_SIZE + IS_ROOT_SIZE + PARENT_POINTER_SIZE;

// Leaf node header layout

const LEAF_NODE_NUM_CELLS_SIZE: usize = std::mem::size_of::<u32>();
const LEAF_NODE_NUM_CELLS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
const LEAF_NODE_NEXT_LEAF_SIZE: usize = std::mem::size_of::<u32>();
const LEAF_NODE_NEXT_LEAF_OFFSET: usize = LEAF_NODE_NUM_CELLS_OFFSET + LEAF_NODE_NUM_CELLS_SIZE;

/// Total size of the leaf node header (14 bytes).
pub const LEAF_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + LEAF_NODE_NUM_CELLS_SIZE + LEAF_NODE_NEXT_LEAF_SIZE;

// Leaf node body layout

const LEAF_NODE_KEY_SIZE: usize = std::mem::size_of::<u32>();
const LEAF_NODE_KEY_OFFSET: usize = 0;
const LEAF_NODE_VALUE_SIZE: usize = ROW_SIZE;
const LEAF_NODE_VALUE_OFFSET: usize = LEAF_NODE_KEY_OFFSET + LEAF_NODE_KEY_SIZE;

/// Total size of a leaf cell: key plus serialized row (295 bytes).
pub const LEAF_NODE_CELL_SIZE: usize = LEAF_NODE_KEY_SIZE + LEAF_NODE_VALUE_SIZE;

/// Space available for cells in a leaf node (page size minus header).
pub const LEAF_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_NODE_HEADER_SIZE;

/// Maximum number of cells that fit in a leaf node (13).
pub const LEAF_NODE_MAX_CELLS: usize = LEAF_NODE_SPACE_FOR_CELLS / LEAF_NODE_CELL_SIZE;

/// Number of cells assigned to the right sibling when splitting a leaf.
pub const LEAF_NODE_RIGHT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1) / 2;

/// Number of cells kept by the left (original) leaf when splitting.
pub const LEAF_NODE_LEFT_SPLIT_COUNT: usize =
    (LEAF_NODE_MAX_CELLS + 1) - LEAF_NODE_RIGHT_SPLIT_COUNT;

// Internal node header layout

const INTERNAL_NODE_NUM_KEYS_SIZE: usize = std::mem::size_of::<u32>();
const INTERNAL_NODE_NUM_KEYS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
const INTERNAL_NODE_RIGHT_CHILD_SIZE: usize = std::mem::size_of::<u32>();
const INTERNAL_NODE_RIGHT_CHILD_OFFSET: usize =
    INTERNAL_NODE_NUM_KEYS_OFFSET + INTERNAL_NODE_NUM_KEYS_SIZE;

/// Total size of an internal node header (14 bytes).
pub const INTERNAL_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + INTERNAL_NODE_NUM_KEYS_SIZE + INTERNAL_NODE_RIGHT_CHILD_SIZE;

// Internal node body layout

const INTERNAL_NODE_KEY_SIZE: usize = std::mem::size_of::<u32>();
const INTERNAL_NODE_CHILD_SIZE: usize = std::mem::size_of::<u32>();

/// Total size of an internal cell: child pointer plus separator key.
pub const INTERNAL_NODE_CELL_SIZE: usize = INTERNAL_NODE_CHILD_SIZE + INTERNAL_NODE_KEY_SIZE;

/// Artificially small fan-out so splitting is exercised early.
pub const INTERNAL_NODE_MAX_CELLS: usize = 3;

/// One page viewed as a B-tree node.
///
/// The accessors below are the only way the rest of the engine touches page
/// bytes; they keep the byte layout in one place.
#[derive(Debug, Clone)]
pub struct Node {
    pub data: [u8; PAGE_SIZE],
}

impl Node {
    /// A zero-filled page. Callers decide the shape with [`Node::init_leaf`]
    /// or [`Node::init_internal`].
    pub fn zeroed() -> Self {
        Node {
            data: [0u8; PAGE_SIZE],
        }
    }

    fn read_u32(&self, offset: usize) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[offset..offset + 4]);
        u32::from_le_bytes(bytes)
    }

    fn write_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Shape of this node, decoded from the first header byte.
    ///
    /// # Errors
    /// Returns `Error::Storage` if the byte is neither 0 (internal) nor
    /// 1 (leaf) — the page is not a node.
    pub fn node_type(&self) -> Result<NodeType, Error> {
        match self.data[NODE_TYPE_OFFSET] {
            0 => Ok(NodeType::Internal),
            1 => Ok(NodeType::Leaf),
            invalid => Err(err!(Storage, "invalid node type byte: {}", invalid)),
        }
    }

    pub fn set_node_type(&mut self, node_type: NodeType) {
        self.data[NODE_TYPE_OFFSET] = match node_type {
            NodeType::Internal => 0,
            NodeType::Leaf => 1,
        };
    }

    pub fn is_root(&self) -> bool {
        self.data[IS_ROOT_OFFSET] == 1
    }

    pub fn set_root(&mut self, is_root: bool) {
        self.data[IS_ROOT_OFFSET] = is_root as u8;
    }

    /// Page number of this node's parent internal node.
    pub fn parent(&self) -> u32 {
        self.read_u32(PARENT_POINTER_OFFSET)
    }

    pub fn set_parent(&mut self, page_num: u32) {
        self.write_u32(PARENT_POINTER_OFFSET, page_num);
    }

    /// Stamps the page as an empty non-root leaf with no sibling.
    pub fn init_leaf(&mut self) {
        self.set_node_type(NodeType::Leaf);
        self.set_root(false);
        self.set_leaf_num_cells(0);
        self.set_leaf_next_leaf(0); // 0 represents no sibling
    }

    /// Stamps the page as an empty non-root internal node.
    pub fn init_internal(&mut self) {
        self.set_node_type(NodeType::Internal);
        self.set_root(false);
        self.set_internal_num_keys(0);
    }

    // Leaf accessors

    pub fn leaf_num_cells(&self) -> u32 {
        self.read_u32(LEAF_NODE_NUM_CELLS_OFFSET)
    }

    pub fn set_leaf_num_cells(&mut self, num: u32) {
        self.write_u32(LEAF_NODE_NUM_CELLS_OFFSET, num);
    }

    /// Page number of the right sibling leaf; 0 means rightmost leaf.
    pub fn leaf_next_leaf(&self) -> u32 {
        self.read_u32(LEAF_NODE_NEXT_LEAF_OFFSET)
    }

    pub fn set_leaf_next_leaf(&mut self, page_num: u32) {
        self.write_u32(LEAF_NODE_NEXT_LEAF_OFFSET, page_num);
    }

    fn leaf_cell_offset(cell_num: u32) -> Result<usize, Error> {
        if cell_num as usize >= LEAF_NODE_MAX_CELLS {
            return Err(err!(
                Storage,
                "leaf cell out of bounds (cell_num={}, max_cells={})",
                cell_num,
                LEAF_NODE_MAX_CELLS
            ));
        }
        Ok(LEAF_NODE_HEADER_SIZE + cell_num as usize * LEAF_NODE_CELL_SIZE)
    }

    pub fn leaf_cell(&self, cell_num: u32) -> Result<&[u8], Error> {
        let offset = Self::leaf_cell_offset(cell_num)?;
        Ok(&self.data[offset..offset + LEAF_NODE_CELL_SIZE])
    }

    pub fn leaf_cell_mut(&mut self, cell_num: u32) -> Result<&mut [u8], Error> {
        let offset = Self::leaf_cell_offset(cell_num)?;
        Ok(&mut self.data[offset..offset + LEAF_NODE_CELL_SIZE])
    }

    pub fn leaf_key(&self, cell_num: u32) -> Result<u32, Error> {
        let offset = Self::leaf_cell_offset(cell_num)?;
        Ok(self.read_u32(offset + LEAF_NODE_KEY_OFFSET))
    }

    pub fn set_leaf_key(&mut self, cell_num: u32, key: u32) -> Result<(), Error> {
        let offset = Self::leaf_cell_offset(cell_num)?;
        self.write_u32(offset + LEAF_NODE_KEY_OFFSET, key);
        Ok(())
    }

    /// The serialized row bytes of cell `cell_num`.
    pub fn leaf_value(&self, cell_num: u32) -> Result<&[u8], Error> {
        let offset = Self::leaf_cell_offset(cell_num)?;
        let start = offset + LEAF_NODE_VALUE_OFFSET;
        Ok(&self.data[start..start + LEAF_NODE_VALUE_SIZE])
    }

    pub fn leaf_value_mut(&mut self, cell_num: u32) -> Result<&mut [u8], Error> {
        let offset = Self::leaf_cell_offset(cell_num)?;
        let start = offset + LEAF_NODE_VALUE_OFFSET;
        Ok(&mut self.data[start..start + LEAF_NODE_VALUE_SIZE])
    }

    /// Binary search over the leaf's sorted cells.
    ///
    /// Returns the index of `key` if present, otherwise the index where it
    /// must be inserted to keep the leaf ordered.
    pub fn find_leaf_cell(&self, key: u32) -> Result<u32, Error> {
        let mut min_index = 0;
        let mut one_past_max_index = self.leaf_num_cells();

        while one_past_max_index != min_index {
            let index = (min_index + one_past_max_index) / 2;
            let key_at_index = self.leaf_key(index)?;
            if key == key_at_index {
                return Ok(index);
            }
            if key < key_at_index {
                one_past_max_index = index;
            } else {
                min_index = index + 1;
            }
        }

        Ok(min_index)
    }

    // Internal accessors

    pub fn internal_num_keys(&self) -> u32 {
        self.read_u32(INTERNAL_NODE_NUM_KEYS_OFFSET)
    }

    pub fn set_internal_num_keys(&mut self, num_keys: u32) {
        self.write_u32(INTERNAL_NODE_NUM_KEYS_OFFSET, num_keys);
    }

    /// Page number of the rightmost child, stored apart from the cells.
    pub fn internal_right_child(&self) -> u32 {
        self.read_u32(INTERNAL_NODE_RIGHT_CHILD_OFFSET)
    }

    pub fn set_internal_right_child(&mut self, page_num: u32) {
        self.write_u32(INTERNAL_NODE_RIGHT_CHILD_OFFSET, page_num);
    }

    fn internal_cell_offset(cell_num: u32) -> Result<usize, Error> {
        if cell_num as usize >= INTERNAL_NODE_MAX_CELLS {
            return Err(err!(
                Storage,
                "internal cell out of bounds (cell_num={}, max_cells={})",
                cell_num,
                INTERNAL_NODE_MAX_CELLS
            ));
        }
        Ok(INTERNAL_NODE_HEADER_SIZE + cell_num as usize * INTERNAL_NODE_CELL_SIZE)
    }

    /// A copy of the `(child, key)` cell at `cell_num`.
    pub fn internal_cell(&self, cell_num: u32) -> Result<[u8; INTERNAL_NODE_CELL_SIZE], Error> {
        let offset = Self::internal_cell_offset(cell_num)?;
        let mut cell = [0u8; INTERNAL_NODE_CELL_SIZE];
        cell.copy_from_slice(&self.data[offset..offset + INTERNAL_NODE_CELL_SIZE]);
        Ok(cell)
    }

    pub fn set_internal_cell(
        &mut self,
        cell_num: u32,
        cell: &[u8; INTERNAL_NODE_CELL_SIZE],
    ) -> Result<(), Error> {
        let offset = Self::internal_cell_offset(cell_num)?;
        self.data[offset..offset + INTERNAL_NODE_CELL_SIZE].copy_from_slice(cell);
        Ok(())
    }

    /// Child page number at `child_num`.
    ///
    /// `child_num == num_keys` addresses the right child; anything beyond is
    /// out of bounds.
    pub fn internal_child(&self, child_num: u32) -> Result<u32, Error> {
        let num_keys = self.internal_num_keys();
        if child_num > num_keys {
            return Err(err!(
                Storage,
                "child index {} exceeds num_keys {}",
                child_num,
                num_keys
            ));
        }
        if child_num == num_keys {
            return Ok(self.internal_right_child());
        }
        let offset = Self::internal_cell_offset(child_num)?;
        Ok(self.read_u32(offset))
    }

    pub fn set_internal_child(&mut self, cell_num: u32, page_num: u32) -> Result<(), Error> {
        let offset = Self::internal_cell_offset(cell_num)?;
        self.write_u32(offset, page_num);
        Ok(())
    }

    pub fn internal_key(&self, key_num: u32) -> Result<u32, Error> {
        let offset = Self::internal_cell_offset(key_num)?;
        Ok(self.read_u32(offset + INTERNAL_NODE_CHILD_SIZE))
    }

    pub fn set_internal_key(&mut self, key_num: u32, key: u32) -> Result<(), Error> {
        let offset = Self::internal_cell_offset(key_num)?;
        self.write_u32(offset + INTERNAL_NODE_CHILD_SIZE, key);
        Ok(())
    }

    /// Binary search over the separator keys.
    ///
    /// Returns the smallest index `i` with `key <= keys[i]`, or `num_keys`
    /// to steer to the right child.
    pub fn find_child(&self, key: u32) -> Result<u32, Error> {
        let mut min_index = 0;
        let mut one_past_max_index = self.internal_num_keys();

        while one_past_max_index != min_index {
            let index = (min_index + one_past_max_index) / 2;
            let key_to_right = self.internal_key(index)?;
            if key <= key_to_right {
                one_past_max_index = index;
            } else {
                min_index = index + 1;
            }
        }

        Ok(min_index)
    }

    /// Rewrites the separator that used to read `old_key`.
    ///
    /// A right child has no separator of its own; when `old_key` lies beyond
    /// every separator there is nothing to rewrite.
    pub fn update_key(&mut self, old_key: u32, new_key: u32) -> Result<(), Error> {
        let index = self.find_child(old_key)?;
        if index < self.internal_num_keys() {
            self.set_internal_key(index, new_key)?;
        }
        Ok(())
    }

    /// Largest key known to this node: the last cell's key in a leaf, the
    /// last separator in an internal node.
    pub fn max_key(&self) -> Result<u32, Error> {
        match self.node_type()? {
            NodeType::Internal => {
                let last = self
                    .internal_num_keys()
                    .checked_sub(1)
                    .ok_or_else(|| err!(Storage, "max key of an internal node with no keys"))?;
                self.internal_key(last)
            }
            NodeType::Leaf => {
                let last = self
                    .leaf_num_cells()
                    .checked_sub(1)
                    .ok_or_else(|| err!(Storage, "max key of an empty leaf"))?;
                self.leaf_key(last)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_constants() {
        assert_eq!(COMMON_NODE_HEADER_SIZE, 6);
        assert_eq!(LEAF_NODE_HEADER_SIZE, 14);
        assert_eq!(LEAF_NODE_CELL_SIZE, 295);
        assert_eq!(LEAF_NODE_SPACE_FOR_CELLS, 4082);
        assert_eq!(LEAF_NODE_MAX_CELLS, 13);
        assert_eq!(LEAF_NODE_LEFT_SPLIT_COUNT, 7);
        assert_eq!(LEAF_NODE_RIGHT_SPLIT_COUNT, 7);
        assert_eq!(INTERNAL_NODE_HEADER_SIZE, 14);
        assert_eq!(INTERNAL_NODE_CELL_SIZE, 8);
    }

    #[test]
    fn test_init_leaf() {
        let mut node = Node::zeroed();
        node.init_leaf();
        assert_eq!(node.node_type().unwrap(), NodeType::Leaf);
        assert!(!node.is_root());
        assert_eq!(node.leaf_num_cells(), 0);
        assert_eq!(node.leaf_next_leaf(), 0);
    }

    #[test]
    fn test_init_internal() {
        let mut node = Node::zeroed();
        node.init_internal();
        assert_eq!(node.node_type().unwrap(), NodeType::Internal);
        assert!(!node.is_root());
        assert_eq!(node.internal_num_keys(), 0);
    }

    #[test]
    fn test_invalid_node_type() {
        let mut node = Node::zeroed();
        node.data[0] = 9;
        assert!(node.node_type().is_err());
    }

    #[test]
    fn test_leaf_cell_round_trip() {
        let mut node = Node::zeroed();
        node.init_leaf();
        node.set_leaf_num_cells(1);
        node.set_leaf_key(0, 42).unwrap();
        node.leaf_value_mut(0).unwrap()[0] = 0xAB;
        assert_eq!(node.leaf_key(0).unwrap(), 42);
        assert_eq!(node.leaf_value(0).unwrap()[0], 0xAB);
        assert!(node.leaf_cell(LEAF_NODE_MAX_CELLS as u32).is_err());
    }

    #[test]
    fn test_find_leaf_cell() {
        let mut node = Node::zeroed();
        node.init_leaf();
        for (i, key) in [10u32, 20, 30].iter().enumerate() {
            node.set_leaf_num_cells(i as u32 + 1);
            node.set_leaf_key(i as u32, *key).unwrap();
        }
        assert_eq!(node.find_leaf_cell(20).unwrap(), 1);
        assert_eq!(node.find_leaf_cell(5).unwrap(), 0);
        assert_eq!(node.find_leaf_cell(25).unwrap(), 2);
        assert_eq!(node.find_leaf_cell(40).unwrap(), 3);
    }

    #[test]
    fn test_find_leaf_cell_empty() {
        let mut node = Node::zeroed();
        node.init_leaf();
        assert_eq!(node.find_leaf_cell(1).unwrap(), 0);
    }

    #[test]
    fn test_find_child() {
        let mut node = Node::zeroed();
        node.init_internal();
        node.set_internal_num_keys(2);
        node.set_internal_child(0, 1).unwrap();
        node.set_internal_key(0, 10).unwrap();
        node.set_internal_child(1, 2).unwrap();
        node.set_internal_key(1, 20).unwrap();
        node.set_internal_right_child(3);

        assert_eq!(node.find_child(5).unwrap(), 0);
        assert_eq!(node.find_child(10).unwrap(), 0);
        assert_eq!(node.find_child(11).unwrap(), 1);
        assert_eq!(node.find_child(20).unwrap(), 1);
        assert_eq!(node.find_child(21).unwrap(), 2);

        assert_eq!(node.internal_child(0).unwrap(), 1);
        assert_eq!(node.internal_child(1).unwrap(), 2);
        assert_eq!(node.internal_child(2).unwrap(), 3);
        assert!(node.internal_child(3).is_err());
    }

    #[test]
    fn test_update_key() {
        let mut node = Node::zeroed();
        node.init_internal();
        node.set_internal_num_keys(1);
        node.set_internal_child(0, 1).unwrap();
        node.set_internal_key(0, 13).unwrap();
        node.set_internal_right_child(2);

        node.update_key(13, 7).unwrap();
        assert_eq!(node.internal_key(0).unwrap(), 7);

        // A key beyond every separator belongs to the right child, which has
        // no separator to rewrite.
        node.update_key(99, 50).unwrap();
        assert_eq!(node.internal_key(0).unwrap(), 7);
    }

    #[test]
    fn test_max_key() {
        let mut leaf = Node::zeroed();
        leaf.init_leaf();
        assert!(leaf.max_key().is_err());
        leaf.set_leaf_num_cells(2);
        leaf.set_leaf_key(0, 3).unwrap();
        leaf.set_leaf_key(1, 8).unwrap();
        assert_eq!(leaf.max_key().unwrap(), 8);

        let mut internal = Node::zeroed();
        internal.init_internal();
        internal.set_internal_num_keys(2);
        internal.set_internal_key(0, 10).unwrap();
        internal.set_internal_key(1, 20).unwrap();
        assert_eq!(internal.max_key().unwrap(), 20);
    }

    #[test]
    fn test_parent_pointer() {
        let mut node = Node::zeroed();
        node.init_leaf();
        node.set_parent(4);
        assert_eq!(node.parent(), 4);
    }
}
