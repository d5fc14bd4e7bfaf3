pub mod architecture_graph;
pub mod node_details;
pub mod scan_log;
