pub mod pipeline_function;
