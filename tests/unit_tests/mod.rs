mod basis;
mod boundary;
mod domain;
mod topology;
