use std::path::Path;

use pka_forge::io::Format;

pub fn input(path: &Path) -> Option<Format> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "smi" | "smiles" | "txt" => Some(Format::Smiles),
        "sdf" | "mol" | "sd" => Some(Format::Sdf),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_from_extension() {
        assert_eq!(input(Path::new("set.smi")), Some(Format::Smiles));
        assert_eq!(input(Path::new("SET.SDF")), Some(Format::Sdf));
        assert_eq!(input(Path::new("ligand.mol")), Some(Format::Sdf));
        assert_eq!(input(Path::new("protein.pdb")), None);
        assert_eq!(input(Path::new("noext")), None);
    }
}
