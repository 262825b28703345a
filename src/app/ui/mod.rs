mod controls;
mod node_list;
mod panels;
