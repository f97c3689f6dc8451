pub mod bracket_list;
