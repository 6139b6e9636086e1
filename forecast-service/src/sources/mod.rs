pub mod readings_csv_file;
pub mod segments;
