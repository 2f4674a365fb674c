
mod scenarios;
