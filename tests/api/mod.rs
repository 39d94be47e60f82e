mod health_tests;
mod signaling_tests;
