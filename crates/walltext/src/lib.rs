mod app;

pub use app::{
    commands::{Command, Operator, Replier},
    config::{CommandNames, DatabaseSettings, WallTextConfig, CONFIG_FILE_NAME},
    console::{menu_text, run_console, ConsoleLine},
    start_walltext, WallText, WallTextHost,
};
