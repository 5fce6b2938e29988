mod mysql_cluster;

pub use mysql_cluster::*;
