pub mod background_run;
