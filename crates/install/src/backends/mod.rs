mod delegated;
mod shell;
mod unprivileged;

pub use delegated::DelegatedInstaller;
pub use shell::ShellInstaller;
pub use unprivileged::UnprivilegedInstaller;
