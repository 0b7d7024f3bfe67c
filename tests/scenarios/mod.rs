mod aging;
mod drivers;
mod numerics;
