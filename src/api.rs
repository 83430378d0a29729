pub mod ichijo;
