mod broken_wrapper_case;
mod forwarding_case;
