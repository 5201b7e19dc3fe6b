/// One cell of the spatial lattice. Its coordinate never changes; the particle list is filled at
/// the start of each step and cleared at the end.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    /// Indices into the grid's particle vector.
    pub particles: Vec<usize>,
}

impl Block {
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Self {
            x,
            y,
            z,
            particles: Vec::new(),
        }
    }

    pub fn coord(&self) -> [usize; 3] {
        [self.x, self.y, self.z]
    }
}
