mod close_case;
mod init_case;
