//! Block generators and the operand pushes they share.

pub mod basic;
pub mod branch;
pub mod operands;

pub use basic::{
    add_block, basic_generator, random_basic, strcat_block, sub_block, BasicGenerator,
    BASIC_BLOCKS,
};
pub use branch::{
    branch_generator, compare_with, random_branch, BranchBlock, BranchGenerator, Comparison,
    Operands, BRANCH_BLOCKS, MAX_JUMP_OFFSET,
};
